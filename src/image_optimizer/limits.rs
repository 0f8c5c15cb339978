//! Source limits (decompression bomb protection)
//!
//! Checked before full decoding: the byte size up front, the dimensions from
//! a header-only probe.

use serde::{Deserialize, Serialize};

use super::error::ImageError;
use super::payload::Dimensions;

/// Limits applied to every source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLimits {
    /// Maximum source payload size in bytes
    #[serde(default = "default_max_source_file_size")]
    pub max_source_file_size: usize,

    /// Maximum allowed total pixels (width * height)
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            max_source_file_size: default_max_source_file_size(),
            max_source_pixels: default_max_source_pixels(),
        }
    }
}

fn default_max_source_file_size() -> usize {
    50 * 1024 * 1024 // 50MB
}

fn default_max_source_pixels() -> u64 {
    100_000_000 // 100 megapixels
}

impl SourceLimits {
    /// No limits; use for trusted inputs only
    pub fn unlimited() -> Self {
        Self {
            max_source_file_size: usize::MAX,
            max_source_pixels: u64::MAX,
        }
    }
}

/// Validate payload size against the byte limit
pub fn validate_file_size(size: usize, limits: &SourceLimits) -> Result<(), ImageError> {
    if size > limits.max_source_file_size {
        return Err(ImageError::FileTooLarge {
            size,
            max_size: limits.max_source_file_size,
        });
    }
    Ok(())
}

/// Validate probed dimensions against the pixel limit
pub fn validate_dimensions(dims: Dimensions, limits: &SourceLimits) -> Result<(), ImageError> {
    if dims.pixels() > limits.max_source_pixels {
        return Err(ImageError::image_bomb(
            dims.width,
            dims.height,
            limits.max_source_pixels,
        ));
    }
    Ok(())
}
