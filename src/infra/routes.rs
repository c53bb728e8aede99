use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit, routing::{get, post}};
use tower_http::services::ServeDir;

use crate::controllers::{
    blog::{create_blog, delete_blog, find_blog, list_blogs, update_blog},
    booking::{quick_booking, send_email},
    health::{cron, health_check},
};
use crate::modules::{blog_store::BlogStore, notification::NotificationService, upload::UploadDir};

/// Request bodies may carry inline base64 images.
pub const BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Everything the handlers need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub blogs: BlogStore,
    pub notifier: Arc<NotificationService>,
    pub uploads: UploadDir,
    /// Served read-only under `/uploads`.
    pub static_root: std::path::PathBuf,
}

pub fn create_router(state: AppState) -> Router {
    let app : Router = Router::new()
        .route("/test", get(health_check))
        .route("/api/cron", get(cron))
        .route("/api/send-email", post(send_email))
        .route("/api/quick-booking", post(quick_booking))
        .route("/api/blogs", get(list_blogs).post(create_blog))
        // GET looks posts up by slug, PATCH and DELETE by id.
        .route("/api/blogs/:key", get(find_blog).patch(update_blog).delete(delete_blog))
        .nest_service("/uploads", ServeDir::new(state.static_root))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(Extension(state.blogs))
        .layer(Extension(state.notifier))
        .layer(Extension(state.uploads));
    app
}
