use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::signal;
use tower_http::trace::TraceLayer;

use goldstar_api::infra::{config::Config, cors, db, logging, routes::{self, AppState}};
use goldstar_api::modules::{
    blog_store::BlogStore,
    image::ImagePipeline,
    mailer::SmtpMailer,
    notification::NotificationService,
    upload::UploadDir,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init_logging();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    tracing::info!("database ready");

    let uploads = UploadDir::new(&config.upload_dir);
    uploads.ensure().await.context("failed to create upload directory")?;

    let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
    {
        let mailer = mailer.clone();
        tokio::spawn(async move {
            match mailer.verify().await {
                Ok(()) => tracing::info!(sender = %mailer.sender(), "SMTP server is ready to take messages"),
                Err(err) => tracing::error!(error = %err, "SMTP verification failed"),
            }
        });
    }
    let notifier = NotificationService::new(mailer, config.recipient_email.clone(), config.mail_timeout)
        .context("failed to load notification templates")?;

    let state = AppState {
        blogs: BlogStore::new(pool.clone(), ImagePipeline::new(config.image_timeout)),
        notifier: Arc::new(notifier),
        uploads,
        static_root: config.upload_dir.clone(),
    };
    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors::create_cors());

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
