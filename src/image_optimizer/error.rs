//! Image optimization error types
//!
//! Every failure carries enough context to tell the caller which stage broke
//! (decode, surface, encode) so upload flows can decide whether to fall back
//! to the original files.

use std::fmt;

/// Coarse classification of an [`ImageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input bytes are not a loadable image (or were rejected before decoding)
    Decode,
    /// The rendered surface could not be serialized to the target format
    Encode,
    /// No rendering surface could be acquired for the computed dimensions
    ContextUnavailable,
    /// The work was cancelled through a cancel signal
    Cancelled,
    /// The per-image timeout elapsed
    Timeout,
    /// The requested policy is invalid
    InvalidPolicy,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Encode => "encode",
            ErrorKind::ContextUnavailable => "context_unavailable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidPolicy => "invalid_policy",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while optimizing a single image
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    // === Decoding Errors ===
    /// Neither the payload nor the declared media type names a known format
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Source payload exceeds the configured byte limit
    FileTooLarge { size: usize, max_size: usize },
    /// Source dimensions exceed the pixel limit (decompression bomb protection)
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    // === Rendering Errors ===
    /// Destination surface could not be created or drawn into
    ContextUnavailable { message: String },

    // === Encoding Errors ===
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },

    // === Control Errors ===
    /// Work was cancelled before it completed
    Cancelled,
    /// Processing took too long
    ProcessingTimeout { timeout_ms: u64 },

    // === Policy Errors ===
    /// Invalid policy value
    InvalidPolicy { param: String, message: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::FileTooLarge { size, max_size } => {
                write!(
                    f,
                    "File size {} bytes exceeds maximum {} bytes",
                    size, max_size
                )
            }
            ImageError::ImageBombDetected {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "Image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            ImageError::ContextUnavailable { message } => {
                write!(f, "Rendering context unavailable: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::Cancelled => write!(f, "Image optimization cancelled"),
            ImageError::ProcessingTimeout { timeout_ms } => {
                write!(f, "Processing timeout after {}ms", timeout_ms)
            }
            ImageError::InvalidPolicy { param, message } => {
                write!(f, "Invalid policy '{}': {}", param, message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// Classify the error
    ///
    /// Limit violations are reported as [`ErrorKind::Decode`]: the payload was
    /// rejected as an input before any pixels were produced.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageError::UnsupportedFormat { .. }
            | ImageError::DecodeFailed { .. }
            | ImageError::FileTooLarge { .. }
            | ImageError::ImageBombDetected { .. } => ErrorKind::Decode,
            ImageError::ContextUnavailable { .. } => ErrorKind::ContextUnavailable,
            ImageError::EncodeFailed { .. } => ErrorKind::Encode,
            ImageError::Cancelled => ErrorKind::Cancelled,
            ImageError::ProcessingTimeout { .. } => ErrorKind::Timeout,
            ImageError::InvalidPolicy { .. } => ErrorKind::InvalidPolicy,
        }
    }

    /// Helper constructors for common error patterns
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ImageError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn context_unavailable(message: impl Into<String>) -> Self {
        ImageError::ContextUnavailable {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_policy(param: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::InvalidPolicy {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}
