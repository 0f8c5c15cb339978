//! Upload of optimized images, falling back to the originals
//!
//! Optimization is best effort: when a batch fails the caller's upload still
//! goes through with the unmodified files, unless fallback is disabled.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::AppError;
use crate::image_optimizer::{BatchSummary, OptimizedImage, Optimizer, SourceImage};

/// A file handed to an uploader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub data: Bytes,
    pub media_type: String,
    pub file_name: String,
}

impl From<&OptimizedImage> for UploadPayload {
    fn from(image: &OptimizedImage) -> Self {
        Self {
            data: image.data.clone(),
            media_type: image.media_type.to_string(),
            file_name: image.file_name.clone(),
        }
    }
}

impl From<&SourceImage> for UploadPayload {
    fn from(source: &SourceImage) -> Self {
        Self {
            data: source.data.clone(),
            media_type: source.media_type.clone(),
            file_name: source.file_name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parent id: {0:?}")]
    InvalidParent(String),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// Destination for images attached to a parent entity (product, category)
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Store `payloads` under `parent_id`, returning one location per payload
    /// in the same order
    async fn upload(
        &self,
        parent_id: &str,
        payloads: Vec<UploadPayload>,
    ) -> Result<Vec<String>, UploadError>;
}

/// Stores payloads as files under `<root>/<parent_id>/`
///
/// Each file is prefixed with its position (`000-photo.jpeg`) so two payloads
/// with the same name never overwrite each other.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn validate_parent_id(parent_id: &str) -> Result<(), UploadError> {
    let valid = !parent_id.is_empty()
        && !parent_id.starts_with('.')
        && !parent_id.contains(['/', '\\']);
    if !valid {
        return Err(UploadError::InvalidParent(parent_id.to_string()));
    }
    Ok(())
}

/// Final path component of `file_name`, rejecting empty and dot names
fn stored_name(file_name: &str) -> Result<String, UploadError> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(UploadError::InvalidFileName(file_name.to_string()));
    }
    Ok(base.to_string())
}

#[async_trait]
impl ImageUploader for DirectoryUploader {
    async fn upload(
        &self,
        parent_id: &str,
        payloads: Vec<UploadPayload>,
    ) -> Result<Vec<String>, UploadError> {
        validate_parent_id(parent_id)?;
        let names = payloads
            .iter()
            .map(|p| stored_name(&p.file_name))
            .collect::<Result<Vec<_>, _>>()?;

        let dir = self.root.join(parent_id);
        tokio::fs::create_dir_all(&dir).await?;

        let mut locations = Vec::with_capacity(payloads.len());
        for (index, (payload, name)) in payloads.iter().zip(names).enumerate() {
            let path = dir.join(format!("{:03}-{}", index, name));
            tokio::fs::write(&path, &payload.data).await?;
            locations.push(path.display().to_string());
        }

        Ok(locations)
    }
}

/// Result of [`upload_with_fallback`]
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Stored locations, in input order
    pub locations: Vec<String>,
    /// False when the originals were uploaded instead
    pub optimized: bool,
    /// Present when optimization succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
    /// Why optimization was skipped, when it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Optimize `sources` and upload the results; on optimization failure upload
/// the originals instead when `fallback` is set
///
/// # Errors
/// * `AppError::Optimize` if optimization fails and `fallback` is false
/// * `AppError::Upload` if the uploader fails
pub async fn upload_with_fallback(
    optimizer: &Optimizer,
    uploader: &dyn ImageUploader,
    parent_id: &str,
    sources: &[SourceImage],
    fallback: bool,
) -> Result<UploadOutcome, AppError> {
    match optimizer.optimize_all(sources).await {
        Ok(images) => {
            let summary = BatchSummary::from_metrics(images.iter().map(|i| &i.metrics));
            let payloads = images.iter().map(UploadPayload::from).collect();
            let locations = uploader.upload(parent_id, payloads).await?;

            info!(
                parent_id = parent_id,
                images = summary.images,
                resized = summary.resized,
                bytes_saved = summary.bytes_saved(),
                "Uploaded optimized images"
            );

            Ok(UploadOutcome {
                locations,
                optimized: true,
                summary: Some(summary),
                fallback_reason: None,
            })
        }
        Err(err) if fallback => {
            warn!(
                parent_id = parent_id,
                error = %err,
                kind = %err.kind(),
                "Image optimization failed, uploading original files"
            );

            let payloads = sources.iter().map(UploadPayload::from).collect();
            let locations = uploader.upload(parent_id, payloads).await?;

            Ok(UploadOutcome {
                locations,
                optimized: false,
                summary: None,
                fallback_reason: Some(err.to_string()),
            })
        }
        Err(err) => Err(err.into()),
    }
}
