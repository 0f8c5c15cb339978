//! Source format detection
//!
//! The payload's magic bytes are authoritative. The declared media type is
//! only consulted when sniffing fails (some formats have weak signatures).

use image::ImageFormat;
use std::path::Path;

use super::error::ImageError;

/// Media types accepted as decoding hints
const MEDIA_TYPES: &[(&str, ImageFormat)] = &[
    ("image/jpeg", ImageFormat::Jpeg),
    ("image/jpg", ImageFormat::Jpeg),
    ("image/pjpeg", ImageFormat::Jpeg),
    ("image/png", ImageFormat::Png),
    ("image/webp", ImageFormat::WebP),
    ("image/gif", ImageFormat::Gif),
];

/// File extensions mapped to the media type callers should declare
const EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// Resolve the format to decode `data` with
///
/// # Errors
/// * `UnsupportedFormat` if neither the bytes nor `declared_media_type`
///   identify a decodable format
pub fn detect_source_format(
    data: &[u8],
    declared_media_type: &str,
) -> Result<ImageFormat, ImageError> {
    if let Ok(format) = image::guess_format(data) {
        return Ok(format);
    }

    format_from_media_type(declared_media_type)
        .ok_or_else(|| ImageError::unsupported_format(declared_media_type))
}

/// Map a declared media type (parameters ignored) to an image format
pub fn format_from_media_type(media_type: &str) -> Option<ImageFormat> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    MEDIA_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, format)| *format)
}

/// Media type for a file based on its extension, `application/octet-stream`
/// when unknown
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    ext.and_then(|ext| {
        EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
    })
    .unwrap_or("application/octet-stream")
}
