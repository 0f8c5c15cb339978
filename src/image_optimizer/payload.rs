//! Input and output payloads of the optimizer

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

use super::metrics::OptimizationMetrics;
use super::policy::OutputFormat;

/// Raw image supplied by the caller
///
/// The optimizer only reads it; `data` is reference counted so the caller
/// keeps its copy for fallback uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Bytes,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
    /// Original file name, e.g. `photo.png`
    pub file_name: String,
}

impl SourceImage {
    pub fn new(
        data: impl Into<Bytes>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Width and height of a raster, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn fits_within(&self, max_width: u32, max_height: u32) -> bool {
        self.width <= max_width && self.height <= max_height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Re-encoded image, owned by the caller once returned
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub data: Bytes,
    pub format: OutputFormat,
    /// Media type matching `format`
    pub media_type: &'static str,
    /// Source base name with the format's extension
    pub file_name: String,
    /// Time of optimization
    pub last_modified: DateTime<Utc>,
    pub dimensions: Dimensions,
    pub metrics: OptimizationMetrics,
}

impl OptimizedImage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Replace the last extension of `file_name` with the one for `format`
///
/// `photo.png` becomes `photo.jpeg`; names without an extension (including
/// dot-files such as `.hidden`) get the extension appended.
pub fn derive_file_name(file_name: &str, format: OutputFormat) -> String {
    let base = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains(['/', '\\']) => stem,
        _ => file_name,
    };
    format!("{}.{}", base, format.extension())
}
