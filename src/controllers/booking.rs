use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::{json, Value};

use crate::{
    controllers::form::BookingBody,
    modules::notification::{NotificationService, NotifyError},
    schemas::booking::{BookingRequest, QuickBookingRequest},
};

fn send_failure(label: &str, err: NotifyError) -> (StatusCode, Json<Value>) {
    match err {
        NotifyError::Validation(message) => (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))),
        err => {
            tracing::error!(error = %err, "{label}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": label, "details": err.to_string() })),
            )
        }
    }
}

pub async fn send_email(
    Extension(notifier): Extension<Arc<NotificationService>>,
    BookingBody(body): BookingBody<BookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    tracing::info!(suburb = ?body.suburb, property_type = ?body.property_type, "booking request received");
    notifier
        .send_booking_notification(&body)
        .await
        .map_err(|err| send_failure("Failed to send email", err))?;
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

pub async fn quick_booking(
    Extension(notifier): Extension<Arc<NotificationService>>,
    BookingBody(body): BookingBody<QuickBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    tracing::info!("quick booking request received");
    notifier
        .send_quick_booking_notification(&body)
        .await
        .map_err(|err| send_failure("Failed to send quick booking email", err))?;
    Ok(Json(json!({ "message": "Quick booking email sent successfully" })))
}
