// Error types module

use std::path::PathBuf;

use crate::image_optimizer::{BatchError, ImageError};
use crate::upload::UploadError;

/// Top-level error for the optimize-and-upload flow
///
/// Library callers that only optimize use [`ImageError`] and [`BatchError`]
/// directly.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration errors (invalid YAML, missing env vars, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a source file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Optimization failed: {0}")]
    Image(#[from] ImageError),

    #[error("Optimization failed: {0}")]
    Optimize(#[from] BatchError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}
