//! # Image Storage
//!
//! Listing photos are written to a local directory and served statically
//! under `/uploads`. The [`ImageStore`] trait keeps handlers independent of
//! where the bytes actually land.

use std::path::PathBuf;

use async_trait::async_trait;
use axum::{body::Bytes, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Public URL prefix for stored images.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("only image files are allowed (got {0})")]
    UnsupportedType(String),
    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("image url '{0}' does not point into the upload directory")]
    ForeignUrl(String),
    #[error("image storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::UnsupportedType(_) | StorageError::TooLarge { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", error.to_string())
                    .with_details(json!({ "images": error.to_string() }))
            }
            StorageError::ForeignUrl(_) | StorageError::Io(_) => {
                tracing::error!(error = %error, "Image storage failure");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Failed to store image",
                )
            }
        }
    }
}

/// Checks an upload's declared content type and size before anything is written.
pub fn validate_image(
    content_type: Option<&str>,
    size: usize,
    max_bytes: usize,
) -> Result<ImageFormat, StorageError> {
    let content_type = content_type.unwrap_or("application/octet-stream");
    let format = ImageFormat::from_content_type(content_type)
        .ok_or_else(|| StorageError::UnsupportedType(content_type.to_string()))?;

    if size > max_bytes {
        return Err(StorageError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    Ok(format)
}

/// Destination for uploaded listing images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the image and returns its public URL.
    async fn store(&self, format: ImageFormat, bytes: Bytes) -> Result<String, StorageError>;

    /// Removes a previously stored image. Missing files are not an error.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// Stores images as `<uuid>.<ext>` files in a local directory.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for_url(&self, url: &str) -> Result<PathBuf, StorageError> {
        let file_name = url
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| {
                !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.')
            })
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;

        Ok(self.root.join(file_name))
    }
}

#[async_trait]
impl ImageStore for LocalDiskStore {
    async fn store(&self, format: ImageFormat, bytes: Bytes) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), format.extension());
        tokio::fs::write(self.root.join(&file_name), &bytes).await?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored image");
        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let path = self.path_for_url(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(url, "Image file already missing");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Best-effort removal of several images, logging failures.
pub async fn remove_all(store: &dyn ImageStore, urls: &[String]) {
    for url in urls {
        if let Err(error) = store.remove(url).await {
            tracing::warn!(url = %url, error = %error, "Failed to remove image file");
        }
    }
}
