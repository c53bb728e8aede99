//! Image ingestion: whatever the client sends (inline data URI or uploaded
//! file) is stored as a JPEG data URI no wider than [`MAX_WIDTH`].

use std::io::Cursor;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};
use thiserror::Error;

use crate::modules::upload::TempUpload;

pub const MAX_WIDTH: u32 = 800;
pub const JPEG_QUALITY: u8 = 80;
pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unable to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("unable to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("unable to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
    #[error("image processing timed out after {0:?}")]
    Timeout(Duration),
    #[error("image processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where an incoming image comes from.
#[derive(Debug)]
pub enum ImageSource {
    DataUri(String),
    Upload(TempUpload),
}

#[derive(Debug, Clone)]
pub struct ImagePipeline {
    max_width: u32,
    quality: u8,
    timeout: Duration,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        ImagePipeline::new(Duration::from_secs(30))
    }
}

impl ImagePipeline {
    pub fn new(timeout: Duration) -> Self {
        ImagePipeline {
            max_width: MAX_WIDTH,
            quality: JPEG_QUALITY,
            timeout,
        }
    }

    /// Turns `source` into a `data:image/jpeg;base64,...` URI. An uploaded
    /// file is consumed and removed whether or not processing succeeds.
    pub async fn normalize(&self, source: ImageSource) -> Result<String, ImageError> {
        let bytes = match source {
            ImageSource::DataUri(uri) => decode_data_uri(&uri)?,
            ImageSource::Upload(upload) => tokio::fs::read(upload.path()).await?,
        };

        let (max_width, quality) = (self.max_width, self.quality);
        let job = tokio::task::spawn_blocking(move || compress(&bytes, max_width, quality));
        let jpeg = tokio::time::timeout(self.timeout, job)
            .await
            .map_err(|_| ImageError::Timeout(self.timeout))???;

        Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(jpeg)))
    }
}

/// Payload after the last `;base64,` marker, or the whole string if there is
/// none.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImageError> {
    let payload = uri.rsplit(";base64,").next().unwrap_or(uri);
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(payload)?)
}

/// Decodes any supported format, scales down to `max_width` keeping the
/// aspect ratio and re-encodes as JPEG.
pub fn compress(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>, ImageError> {
    let decoded = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
    let (width, height) = decoded.dimensions();

    let resized = if width > max_width {
        let scaled_height = ((height as f64) * (max_width as f64) / (width as f64)).round() as u32;
        decoded.resize_exact(max_width, scaled_height.max(1), FilterType::Lanczos3)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(ImageError::Encode)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::upload::UploadDir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode_output(uri: &str) -> DynamicImage {
        assert!(uri.starts_with(DATA_URI_PREFIX));
        let bytes = STANDARD.decode(&uri[DATA_URI_PREFIX.len()..]).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        image::load_from_memory(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wide_images_are_scaled_to_max_width() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(png(1600, 400)));
        let out = ImagePipeline::default()
            .normalize(ImageSource::DataUri(uri))
            .await
            .unwrap();
        let decoded = decode_output(&out);
        assert_eq!(decoded.dimensions(), (800, 200));
    }

    #[tokio::test]
    async fn every_accepted_format_comes_out_as_jpeg() {
        let cases = [
            (image::ImageFormat::Jpeg, DynamicImage::new_rgb8(1200, 300)),
            (image::ImageFormat::Gif, DynamicImage::new_rgba8(1000, 500)),
            (image::ImageFormat::WebP, DynamicImage::new_rgb8(900, 90)),
            (image::ImageFormat::WebP, DynamicImage::new_rgba8(640, 480)),
        ];
        for (format, input) in cases {
            let mut bytes = Vec::new();
            input.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
            let mime = format.to_mime_type();

            let out = ImagePipeline::default()
                .normalize(ImageSource::DataUri(format!("data:{mime};base64,{}", STANDARD.encode(&bytes))))
                .await
                .unwrap();
            let decoded = decode_output(&out);
            assert!(decoded.width() <= MAX_WIDTH, "{format:?} came out {} wide", decoded.width());
            if input.width() <= MAX_WIDTH {
                assert_eq!(decoded.dimensions(), input.dimensions(), "{format:?}");
            } else {
                assert_eq!(decoded.width(), MAX_WIDTH, "{format:?}");
            }
        }
    }

    #[tokio::test]
    async fn narrow_images_keep_their_size() {
        let out = ImagePipeline::default()
            .normalize(ImageSource::DataUri(STANDARD.encode(png(120, 60))))
            .await
            .unwrap();
        assert_eq!(decode_output(&out).dimensions(), (120, 60));
    }

    #[tokio::test]
    async fn uploads_are_normalized_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let upload = UploadDir::new(root.path()).store("big.png", &png(900, 900)).await.unwrap();
        let path = upload.path().to_path_buf();

        let out = ImagePipeline::default()
            .normalize(ImageSource::Upload(upload))
            .await
            .unwrap();
        assert_eq!(decode_output(&out).dimensions(), (800, 800));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_uploads_are_removed_too() {
        let root = tempfile::tempdir().unwrap();
        let upload = UploadDir::new(root.path()).store("fake.png", b"not an image").await.unwrap();
        let path = upload.path().to_path_buf();

        let err = ImagePipeline::default()
            .normalize(ImageSource::Upload(upload))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_images_fail_to_decode() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"hello world"));
        let err = ImagePipeline::default()
            .normalize(ImageSource::DataUri(uri))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));

        let err = ImagePipeline::default()
            .normalize(ImageSource::DataUri("data:image/png;base64,@@@".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Base64(_)));
    }
}
