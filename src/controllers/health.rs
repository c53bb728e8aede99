use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "Server is working" }))
}

/// Pinged by an external scheduler to keep the host awake.
pub async fn cron() -> Json<Value> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    tracing::info!(%timestamp, "cron ping");
    Json(json!({
        "status": "success",
        "message": "Cron job executed successfully",
        "timestamp": timestamp
    }))
}
