use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Serialize, FromRow, Deserialize, Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub slug: String,
    pub image: Option<String>,
}

/// Body of `POST /api/blogs` and `PATCH /api/blogs/:id`, whether it came in as
/// JSON or as multipart text fields.
///
/// `image` is tri-state: absent (`None`), explicitly cleared (`Some(None)`) or
/// carrying a data URI (`Some(Some(..))`).
#[derive(Deserialize, Debug, Default, Clone)]
pub struct BlogPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl BlogPayload {
    /// The inline data URI, if the payload carries a non-blank one.
    pub fn inline_image(&self) -> Option<&str> {
        match &self.image {
            Some(Some(uri)) if !uri.trim().is_empty() => Some(uri.as_str()),
            _ => None,
        }
    }

    /// True when the payload explicitly asks to drop the stored image.
    pub fn clears_image(&self) -> bool {
        matches!(&self.image, Some(None)) || matches!(&self.image, Some(Some(uri)) if uri.trim().is_empty())
    }
}

/// Fields of a post about to be inserted; the image is already normalized.
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub slug: String,
    pub image: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub slug: Option<String>,
    pub image: Option<Option<String>>,
}

impl BlogPost {
    pub fn merge(mut self, patch: BlogPatch) -> BlogPost {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(slug) = patch.slug {
            self.slug = slug;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        self
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) and
/// bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    // Dates are stored as RFC 3339 text and ordered lexically, which only
    // holds for four-digit years.
    parse_any_date(raw.trim()).filter(|date| (0..=9999).contains(&date.year()))
}

fn parse_any_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}
