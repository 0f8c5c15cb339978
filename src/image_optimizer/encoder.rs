//! Image encoder abstraction
//!
//! Provides a trait-based encoder system that allows:
//! - Swapping encoders per output format
//! - Consistent quality settings across formats
//! - Format-specific handling of transparency

use super::error::ImageError;
use super::policy::OutputFormat;

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderQuality {
    /// Quality in (0, 1], where 1 is best quality
    pub quality: f32,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: super::policy::DEFAULT_QUALITY,
        }
    }
}

impl EncoderQuality {
    /// Create quality settings with specified quality level
    pub fn with_quality(quality: f32) -> Self {
        let quality = if quality.is_finite() {
            quality.clamp(0.01, 1.0)
        } else {
            super::policy::DEFAULT_QUALITY
        };
        Self { quality }
    }

    /// Quality on the 1-100 scale used by the JPEG encoder
    pub fn as_percent(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Quality on the 0-100 float scale used by libwebp
    pub fn as_webp_factor(&self) -> f32 {
        (self.quality * 100.0).clamp(0.0, 100.0)
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
    /// Media type of `data`
    pub media_type: &'static str,
}

impl EncodedImage {
    /// Create a new encoded image result
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        let media_type = format.media_type();
        Self {
            data,
            format,
            media_type,
        }
    }
}

/// Trait for image encoders
///
/// Implementations handle encoding raw image data to specific formats.
/// The trait is object-safe to allow dynamic dispatch when needed.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode raw RGBA image data to the target format
    ///
    /// # Arguments
    /// * `data` - Raw pixel data in RGBA format (4 bytes per pixel)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `quality` - Quality settings
    ///
    /// # Returns
    /// * `Ok(EncodedImage)` - Encoded image data with metadata
    /// * `Err(ImageError)` - If encoding fails or produces no bytes
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate
///
/// Transparent pixels are composited over white before encoding.
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        check_buffer(data, width, height, OutputFormat::Jpeg)?;
        let rgb_data = flatten_onto_white(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.as_percent());

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        non_empty(output.into_inner(), OutputFormat::Jpeg)
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// Lossy WebP encoder backed by libwebp
///
/// The `image` crate only writes lossless WebP, which ignores quality, so
/// this goes through the `webp` crate instead.
#[derive(Default)]
pub struct WebpEncoder;

impl ImageEncoder for WebpEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Webp
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        check_buffer(data, width, height, OutputFormat::Webp)?;

        let memory = webp::Encoder::from_rgba(data, width, height)
            .encode_simple(false, quality.as_webp_factor())
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        non_empty(memory.to_vec(), OutputFormat::Webp)
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Webp => Box::new(WebpEncoder),
        }
    }
}

fn check_buffer(
    data: &[u8],
    width: u32,
    height: u32,
    format: OutputFormat,
) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::encode_failed(
            format.as_str(),
            format!("cannot encode a {}x{} surface", width, height),
        ));
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(ImageError::encode_failed(
            format.as_str(),
            format!("expected {} RGBA bytes, got {}", expected, data.len()),
        ));
    }
    Ok(())
}

fn non_empty(data: Vec<u8>, format: OutputFormat) -> Result<EncodedImage, ImageError> {
    if data.is_empty() {
        return Err(ImageError::encode_failed(
            format.as_str(),
            "encoder produced no output",
        ));
    }
    Ok(EncodedImage::new(data, format))
}

/// Convert RGBA to RGB, compositing over a white background
fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        let alpha = chunk[3] as u32;
        for &channel in &chunk[..3] {
            let blended = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }

    rgb
}
