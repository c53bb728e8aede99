use axum::{Extension, Json, http::StatusCode, extract::Path, response::IntoResponse};
use serde_json::{json, Value};

use crate::{
    controllers::form::BlogForm,
    modules::{blog_store::{BlogStore, StoreError}, image::ImageError},
};

fn blog_error(err: StoreError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Image(ImageError::Io(_) | ImageError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Image(_) => StatusCode::BAD_REQUEST,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "blog request failed");
    } else {
        tracing::warn!(error = %err, "blog request rejected");
    }
    (status, Json(json!({ "message": err.to_string() })))
}

// Ids that are not numbers cannot match any row.
fn parse_id(raw: &str) -> Result<i64, (StatusCode, Json<Value>)> {
    raw.parse().map_err(|_| blog_error(StoreError::NotFound))
}

pub async fn list_blogs(
    Extension(store): Extension<BlogStore>
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let blogs = store.list_all().await.map_err(blog_error)?;
    Ok(Json(blogs))
}

pub async fn find_blog(
    Path(slug): Path<String>,
    Extension(store): Extension<BlogStore>
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let blog = store.get_by_slug(&slug).await.map_err(blog_error)?;
    Ok(Json(blog))
}

pub async fn create_blog(
    Extension(store): Extension<BlogStore>,
    form: BlogForm
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let blog = store.create(form.payload, form.upload).await.map_err(blog_error)?;
    Ok((StatusCode::CREATED, Json(blog)))
}

pub async fn update_blog(
    Path(id): Path<String>,
    Extension(store): Extension<BlogStore>,
    form: BlogForm
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let id = parse_id(&id)?;
    let blog = store.update(id, form.payload, form.upload).await.map_err(blog_error)?;
    Ok(Json(blog))
}

pub async fn delete_blog(
    Path(id): Path<String>,
    Extension(store): Extension<BlogStore>
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let id = parse_id(&id)?;
    store.delete(id).await.map_err(blog_error)?;
    Ok(Json(json!({ "message": "Blog post deleted" })))
}
