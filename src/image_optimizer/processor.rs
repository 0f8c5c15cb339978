//! Image processing implementation
//!
//! Handles the actual image transformation: decode → resize → encode.
//! Everything here is synchronous and CPU bound; the async layer in
//! [`super::optimizer`] moves it onto the blocking pool.

use chrono::Utc;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Instant;
use tracing::debug;

use super::cancel::CancelSignal;
use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::ImageError;
use super::format::detect_source_format;
use super::limits::{validate_dimensions, validate_file_size, SourceLimits};
use super::metrics::{OptimizationMetrics, TransformationType};
use super::orientation::Orientation;
use super::payload::{derive_file_name, Dimensions, OptimizedImage, SourceImage};
use super::policy::{OptimizationPolicy, OutputFormat};
use super::resize::{fit_within, resize_image};

/// A synchronous single-image pipeline
///
/// Implementations must not keep references to the source or intermediate
/// buffers once `process` returns.
pub trait ImageProcessor: Send + Sync {
    fn process(
        &self,
        source: &SourceImage,
        policy: &OptimizationPolicy,
        cancel: &CancelSignal,
    ) -> Result<OptimizedImage, ImageError>;
}

/// Default pipeline: `image` decode, `fast_image_resize` resampling,
/// JPEG/WebP encoders
#[derive(Debug, Clone, Default)]
pub struct RasterPipeline {
    limits: SourceLimits,
}

impl RasterPipeline {
    pub fn new(limits: SourceLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SourceLimits {
        &self.limits
    }
}

impl ImageProcessor for RasterPipeline {
    fn process(
        &self,
        source: &SourceImage,
        policy: &OptimizationPolicy,
        cancel: &CancelSignal,
    ) -> Result<OptimizedImage, ImageError> {
        let started = Instant::now();
        checkpoint(cancel)?;

        // 1. Decode the image
        validate_file_size(source.data.len(), &self.limits)?;
        let source_format = detect_source_format(&source.data, &source.media_type)?;
        let stored = probe_dimensions(&source.data, source_format)?;
        validate_dimensions(stored, &self.limits)?;
        let orientation = Orientation::read(&source.data, source_format);
        let original = orientation.display_dimensions(stored);
        let img = orientation.apply(decode_image(&source.data, source_format)?);
        checkpoint(cancel)?;

        // 2. Calculate target dimensions
        let target = fit_within(original, policy.max_width, policy.max_height);

        // 3. Resize if dimensions changed; the decoded image is dropped here
        let surface = if target != original {
            let resized = resize_image(&img, target, policy.filter)?;
            drop(img);
            resized
        } else {
            img.into_rgba8()
        };
        checkpoint(cancel)?;

        // 4. Encode to target format
        let encoder = EncoderFactory::create(policy.format);
        let encoded = encoder.encode(
            surface.as_raw(),
            target.width,
            target.height,
            EncoderQuality::with_quality(policy.quality),
        )?;
        drop(surface);

        let mut metrics = OptimizationMetrics::builder()
            .original_size(source.data.len())
            .optimized_size(encoded.data.len())
            .original_dimensions(original)
            .optimized_dimensions(target)
            .output_format(policy.format)
            .processing_time(started.elapsed());
        if !orientation.is_normal() {
            metrics = metrics.transformation(TransformationType::ExifRotation);
        }
        if target != original {
            metrics = metrics.transformation(TransformationType::Resize);
        }
        if !same_format(source_format, policy.format) {
            metrics = metrics.transformation(TransformationType::FormatConversion);
        }
        if policy.quality < 1.0 {
            metrics = metrics.transformation(TransformationType::QualityAdjustment);
        }
        let metrics = metrics.build();

        debug!(
            file_name = %source.file_name,
            source_format = ?source_format,
            original = %original,
            output = %target,
            format = %policy.format,
            original_bytes = metrics.original_size,
            optimized_bytes = metrics.optimized_size,
            elapsed_ms = metrics.processing_time.as_millis() as u64,
            "Image optimized"
        );

        Ok(OptimizedImage {
            data: encoded.data.into(),
            format: encoded.format,
            media_type: encoded.media_type,
            file_name: derive_file_name(&source.file_name, policy.format),
            last_modified: Utc::now(),
            dimensions: target,
            metrics,
        })
    }
}

/// Optimize one image on the current thread with default limits
pub fn optimize_blocking(
    source: &SourceImage,
    policy: &OptimizationPolicy,
) -> Result<OptimizedImage, ImageError> {
    RasterPipeline::default().process(source, policy, &CancelSignal::never())
}

fn checkpoint(cancel: &CancelSignal) -> Result<(), ImageError> {
    if cancel.is_cancelled() {
        return Err(ImageError::Cancelled);
    }
    Ok(())
}

/// Read only the header to get the dimensions
fn probe_dimensions(data: &[u8], format: ImageFormat) -> Result<Dimensions, ImageError> {
    ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map(Dimensions::from)
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8], format: ImageFormat) -> Result<DynamicImage, ImageError> {
    ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

fn same_format(source: ImageFormat, target: OutputFormat) -> bool {
    matches!(
        (source, target),
        (ImageFormat::Jpeg, OutputFormat::Jpeg) | (ImageFormat::WebP, OutputFormat::Webp)
    )
}
