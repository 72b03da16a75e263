//! # wp-storage-local
//! waypoint/crates/wp-plugins/wp-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Photos are resized to a fixed width and stored under a random name.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use tokio::fs;
use uuid::Uuid;
use wp_core::error::AppError;
use wp_core::traits::MediaStore;

/// Width every stored photo is scaled to; height follows the aspect ratio.
pub const PHOTO_WIDTH: u32 = 800;

/// Anything we cannot decode is the uploader's problem, not ours.
fn rejected() -> anyhow::Error {
    anyhow::Error::new(AppError::ValidationError("That filetype isn't allowed!".into()))
}

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./public/uploads")
    root_path: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root_path: root }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves `{uuid}.{subtype}`, e.g. `0b6c…e1.jpeg`.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let format = ImageFormat::from_mime_type(content_type).ok_or_else(|| {
            log::debug!("no encoder for {content_type}");
            rejected()
        })?;
        let extension = content_type
            .split('/')
            .nth(1)
            .and_then(|s| s.split(';').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(rejected)?;

        // Decoding and resampling are CPU-bound.
        let encoded = tokio::task::spawn_blocking(move || resize_to_width(data, format, PHOTO_WIDTH)).await??;

        fs::create_dir_all(&self.root_path).await?;
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.root_path.join(&filename), encoded).await?;

        log::debug!("stored photo {}", filename);
        Ok(filename)
    }
}

/// Decodes, scales to `width` keeping the aspect ratio, and re-encodes.
fn resize_to_width(data: Vec<u8>, format: ImageFormat, width: u32) -> anyhow::Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            log::debug!("undecodable upload: {e}");
            rejected()
        })?;

    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1))).max(1);
    let resized = img.resize_exact(width, u32::try_from(height)?, FilterType::Lanczos3);

    // JPEG has no alpha channel.
    let resized = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("waypoint-uploads-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_photo_is_resized_to_800_wide() {
        let root = scratch_dir();
        let store = LocalMediaStore::new(root.clone());

        let name = store.save_upload(png(1600, 400), "image/png").await.unwrap();
        assert!(name.ends_with(".png"));

        let saved = image::open(root.join(&name)).unwrap();
        assert_eq!(saved.dimensions(), (PHOTO_WIDTH, 200));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_small_jpeg_is_scaled_up() {
        let root = scratch_dir();
        let store = LocalMediaStore::new(root.clone());

        let jpeg = resize_to_width(png(100, 50), ImageFormat::Jpeg, 100).unwrap();
        let name = store.save_upload(jpeg, "image/jpeg").await.unwrap();
        assert!(name.ends_with(".jpeg"));
        assert_eq!(image::open(root.join(&name)).unwrap().dimensions(), (PHOTO_WIDTH, 400));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_undecodable_uploads_are_validation_errors() {
        let root = scratch_dir();
        let store = LocalMediaStore::new(root.clone());
        let cases = [
            (b"not an image".to_vec(), "image/png"),
            (png(10, 10), "image/svg+xml"),
            (png(10, 10), "image/heic"),
            (png(10, 10), "text/plain"),
        ];
        for (data, content_type) in cases {
            let err = store.save_upload(data, content_type).await.unwrap_err();
            assert!(
                matches!(AppError::from(err), AppError::ValidationError(ref msg) if msg == "That filetype isn't allowed!"),
                "{content_type} should be rejected as a bad upload"
            );
        }
        assert!(!root.exists());
    }
}
