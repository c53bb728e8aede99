use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::modules::{image::ImageSource, upload::UploadDir};
use crate::schemas::blog::BlogPayload;

type Rejection = (StatusCode, Json<Value>);

fn bad_request(message: impl Into<String>) -> Rejection {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message.into() })))
}

#[derive(Debug, PartialEq)]
enum BodyKind {
    Json,
    UrlEncoded,
    Multipart,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let essence = mime.split(';').next().unwrap_or_default().trim();
    if essence == "application/x-www-form-urlencoded" {
        BodyKind::UrlEncoded
    } else if essence == "multipart/form-data" {
        BodyKind::Multipart
    } else if essence == "application/json" || essence.ends_with("+json") {
        BodyKind::Json
    } else {
        BodyKind::Other
    }
}

/// Booking form body, accepted as JSON or as a url-encoded HTML form. A
/// request without a recognised body type yields an empty form so that the
/// notification's own validation decides the response.
#[derive(Debug)]
pub struct BookingBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for BookingBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let invalid = |message: String| (StatusCode::BAD_REQUEST, Json(json!({ "error": message })));
        match body_kind(req.headers()) {
            BodyKind::Json => {
                let Json(body) = Json::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| invalid(rejection.body_text()))?;
                Ok(BookingBody(body))
            }
            BodyKind::UrlEncoded => {
                let Form(body) = Form::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| invalid(rejection.body_text()))?;
                Ok(BookingBody(body))
            }
            BodyKind::Multipart | BodyKind::Other => Ok(BookingBody(T::default())),
        }
    }
}

/// Blog create/update body, accepted as JSON, as a url-encoded form or as
/// `multipart/form-data` with an optional `image` file part.
#[derive(Debug)]
pub struct BlogForm {
    pub payload: BlogPayload,
    pub upload: Option<ImageSource>,
}

#[async_trait]
impl<S> FromRequest<S> for BlogForm
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match body_kind(req.headers()) {
            BodyKind::Multipart => {}
            BodyKind::UrlEncoded => {
                let Form(payload) = Form::<BlogPayload>::from_request(req, state)
                    .await
                    .map_err(|rejection| bad_request(rejection.body_text()))?;
                return Ok(BlogForm { payload, upload: None });
            }
            BodyKind::Json | BodyKind::Other => {
                let Json(payload) = Json::<BlogPayload>::from_request(req, state)
                    .await
                    .map_err(|rejection| bad_request(rejection.body_text()))?;
                return Ok(BlogForm { payload, upload: None });
            }
        }

        let uploads = req.extensions().get::<UploadDir>().cloned().ok_or_else(|| {
            tracing::error!("upload directory extension is missing");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "upload directory is not configured" })),
            )
        })?;
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| bad_request(rejection.body_text()))?;

        let mut fields = HashMap::new();
        let mut upload = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| bad_request(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) if name == "image" => {
                    let is_image = field
                        .content_type()
                        .map(|mime| mime.starts_with("image/"))
                        .unwrap_or(false);
                    let bytes = field.bytes().await.map_err(|err| bad_request(err.body_text()))?;
                    // Browsers send an empty file part when nothing was picked.
                    if bytes.is_empty() {
                        continue;
                    }
                    if !is_image {
                        return Err(bad_request("Not an image! Please upload an image."));
                    }
                    let stored = uploads.store(&file_name, &bytes).await.map_err(|err| {
                        tracing::error!(error = %err, "failed to store upload");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "message": "failed to store upload" })),
                        )
                    })?;
                    upload = Some(ImageSource::Upload(stored));
                }
                _ => {
                    let text = field.text().await.map_err(|err| bad_request(err.body_text()))?;
                    fields.insert(name, text);
                }
            }
        }

        let payload = BlogPayload {
            title: fields.remove("title"),
            description: fields.remove("description"),
            content: fields.remove("content"),
            date: fields.remove("date"),
            slug: fields.remove("slug"),
            image: fields.remove("image").map(Some),
        };
        Ok(BlogForm { payload, upload })
    }
}
