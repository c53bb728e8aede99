use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use thiserror::Error;

use crate::modules::image::{ImageError, ImagePipeline, ImageSource};
use crate::schemas::blog::{parse_date, BlogPatch, BlogPayload, BlogPost, NewBlogPost};

const COLUMNS: &str = "id, title, description, content, date, slug, image";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("Blog post not found")]
    NotFound,
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Blog posts in SQLite. Images pass through the [`ImagePipeline`] before
/// anything is written.
#[derive(Clone)]
pub struct BlogStore {
    pool: SqlitePool,
    images: ImagePipeline,
}

impl BlogStore {
    pub fn new(pool: SqlitePool, images: ImagePipeline) -> Self {
        BlogStore { pool, images }
    }

    pub async fn list_all(&self) -> Result<Vec<BlogPost>, StoreError> {
        let blogs = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {COLUMNS} FROM blogs ORDER BY date DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<BlogPost, StoreError> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {COLUMNS} FROM blogs WHERE slug = ? ORDER BY date DESC, id DESC LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: i64) -> Result<BlogPost, StoreError> {
        sqlx::query_as::<_, BlogPost>(&format!("SELECT {COLUMNS} FROM blogs WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// An inline `image` field wins over an uploaded file, which is then
    /// discarded unread.
    pub async fn create(&self, payload: BlogPayload, upload: Option<ImageSource>) -> Result<BlogPost, StoreError> {
        let date = match payload.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => parse_date(raw).ok_or_else(|| invalid_date(raw))?,
            None => Utc::now(),
        };
        let post = NewBlogPost {
            title: payload.title.clone().unwrap_or_default(),
            description: payload.description.clone().unwrap_or_default(),
            content: payload.content.clone().unwrap_or_default(),
            date,
            slug: payload.slug.clone().unwrap_or_default(),
            image: None,
        };
        validate(&post.title, &post.description, &post.content, &post.slug)?;

        let image = match (payload.inline_image(), upload) {
            (Some(uri), _) => Some(self.images.normalize(ImageSource::DataUri(uri.to_string())).await?),
            (None, Some(source)) => Some(self.images.normalize(source).await?),
            (None, None) => None,
        };
        let post = NewBlogPost { image, ..post };

        let blog = sqlx::query_as::<_, BlogPost>(&format!(
            "INSERT INTO blogs (title, description, content, date, slug, image) VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.content)
        .bind(post.date)
        .bind(&post.slug)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(id = blog.id, slug = %blog.slug, "blog post created");
        Ok(blog)
    }

    pub async fn update(&self, id: i64, payload: BlogPayload, upload: Option<ImageSource>) -> Result<BlogPost, StoreError> {
        let existing = self.get_by_id(id).await?;

        let date = match payload.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| invalid_date(raw))?),
            None => None,
        };
        let mut patch = BlogPatch {
            title: payload.title.clone(),
            description: payload.description.clone(),
            content: payload.content.clone(),
            date,
            slug: payload.slug.clone(),
            image: None,
        };
        let merged = existing.merge(patch.clone());
        validate(&merged.title, &merged.description, &merged.content, &merged.slug)?;

        patch.image = match (payload.inline_image(), upload) {
            (Some(uri), _) => Some(Some(self.images.normalize(ImageSource::DataUri(uri.to_string())).await?)),
            (None, Some(source)) => Some(Some(self.images.normalize(source).await?)),
            (None, None) if payload.clears_image() => Some(None),
            (None, None) => None,
        };
        let merged = merged.merge(BlogPatch {
            image: patch.image,
            ..BlogPatch::default()
        });

        let blog = sqlx::query_as::<_, BlogPost>(&format!(
            "UPDATE blogs SET title = ?, description = ?, content = ?, date = ?, slug = ?, image = ? WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(&merged.content)
        .bind(merged.date)
        .bind(&merged.slug)
        .bind(&merged.image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        // Deleted between the read and the write.
        .ok_or(StoreError::NotFound)?;

        tracing::info!(id = blog.id, slug = %blog.slug, "blog post updated");
        Ok(blog)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(id, "blog post deleted");
        Ok(())
    }
}

fn invalid_date(raw: &str) -> StoreError {
    StoreError::Validation(format!("date: `{raw}` is not a valid date"))
}

fn validate(title: &str, description: &str, content: &str, slug: &str) -> Result<(), StoreError> {
    let missing: Vec<&str> = [
        ("title", title),
        ("description", description),
        ("content", content),
        ("slug", slug),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(format!(
            "Blog validation failed: {} required",
            missing.join(", ")
        )))
    }
}
