//! Image optimization module
//!
//! Prepares product and category images for upload:
//! - Decode JPEG, PNG, WebP or GIF sources (sniffed, media type as a hint)
//! - Apply the EXIF orientation of JPEG and WebP photos
//! - Resize under a `max_width` x `max_height` ceiling, keeping aspect ratio
//! - Re-encode to JPEG or lossy WebP at a given quality
//!
//! # Defaults
//!
//! 1920 x 1920, quality 0.85, JPEG.
//!
//! # Batches
//!
//! [`optimize_images`] runs every image concurrently and returns results in
//! input order. It is all-or-nothing: one failure fails the batch.
//! [`Optimizer::optimize_each`] returns every outcome instead.
//!
//! ```no_run
//! # use storefront_images::image_optimizer::{optimize_images, PolicyOverrides, SourceImage};
//! # async fn run(sources: Vec<SourceImage>) -> Result<(), Box<dyn std::error::Error>> {
//! let overrides: PolicyOverrides = "w:800,h:600,q:0.8,f:webp".parse()?;
//! let optimized = optimize_images(&sources, Some(overrides)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod encoder;
pub mod error;
pub mod format;
pub mod limits;
pub mod metrics;
pub mod optimizer;
pub mod orientation;
pub mod payload;
pub mod policy;
pub mod processor;
pub mod resize;

// Re-export commonly used types
pub use cancel::{CancelHandle, CancelSignal};
pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::{ErrorKind, ImageError};
pub use format::{detect_source_format, media_type_for_path};
pub use limits::SourceLimits;
pub use metrics::{BatchSummary, OptimizationMetrics, TransformationType};
pub use optimizer::{optimize_image, optimize_images, BatchError, Optimizer};
pub use orientation::Orientation;
pub use payload::{derive_file_name, Dimensions, OptimizedImage, SourceImage};
pub use policy::{
    parse_quality, OptimizationPolicy, OutputFormat, PolicyOverrides, ResampleFilter,
    DEFAULT_FORMAT, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY,
};
pub use processor::{optimize_blocking, ImageProcessor, RasterPipeline};
pub use resize::fit_within;
