use std::path::{Path, PathBuf};

use crate::modules::rand::upload_file_name;

/// Directory that receives multipart image uploads before they are normalized.
#[derive(Debug, Clone)]
pub struct UploadDir(PathBuf);

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        UploadDir(root.into().join("blog"))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.0).await
    }

    /// Writes `bytes` to a fresh file in this directory. The returned guard
    /// deletes the file when dropped.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<TempUpload> {
        self.ensure().await?;
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("");
        let path = self.0.join(upload_file_name(extension));
        let upload = TempUpload { path };
        tokio::fs::write(&upload.path, bytes).await?;
        Ok(upload)
    }
}

/// An uploaded file on disk, removed on drop whatever the outcome of the
/// request that created it.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temporary upload"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove temporary upload")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_is_removed_when_guard_drops() {
        let root = tempfile::tempdir().unwrap();
        let dir = UploadDir::new(root.path());

        let upload = dir.store("photo.PNG", b"bytes").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "PNG");
        assert!(path.starts_with(root.path().join("blog")));

        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn odd_extensions_are_dropped() {
        let root = tempfile::tempdir().unwrap();
        let dir = UploadDir::new(root.path());
        let upload = dir.store("../../evil.p/ng", b"x").await.unwrap();
        assert_eq!(upload.path().parent().unwrap(), dir.path());
    }
}
