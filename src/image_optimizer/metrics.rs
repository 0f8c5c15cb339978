//! Optimization metrics
//!
//! This module implements:
//! - Per-image size, dimension and timing figures
//! - Applied transformation tracking
//! - Batch-level aggregation for summaries

use serde::Serialize;
use std::time::Duration;

use super::payload::Dimensions;
use super::policy::OutputFormat;

/// Metrics for a single optimized image
#[derive(Debug, Clone)]
pub struct OptimizationMetrics {
    /// Source payload size in bytes
    pub original_size: usize,
    /// Encoded payload size in bytes
    pub optimized_size: usize,
    /// Source dimensions
    pub original_dimensions: Dimensions,
    /// Output dimensions
    pub optimized_dimensions: Dimensions,
    /// Output format used
    pub output_format: OutputFormat,
    /// Time spent decoding, resizing and encoding
    pub processing_time: Duration,
    /// Transformations applied
    pub transformations: Vec<TransformationType>,
}

/// Types of transformations that can be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
    ExifRotation,
    Resize,
    FormatConversion,
    QualityAdjustment,
}

impl TransformationType {
    /// Get the label for this transformation type
    pub fn as_label(&self) -> &'static str {
        match self {
            TransformationType::ExifRotation => "exif_rotation",
            TransformationType::Resize => "resize",
            TransformationType::FormatConversion => "format_conversion",
            TransformationType::QualityAdjustment => "quality_adjustment",
        }
    }
}

impl Default for OptimizationMetrics {
    fn default() -> Self {
        Self {
            original_size: 0,
            optimized_size: 0,
            original_dimensions: Dimensions::new(0, 0),
            optimized_dimensions: Dimensions::new(0, 0),
            output_format: OutputFormat::Jpeg,
            processing_time: Duration::ZERO,
            transformations: Vec::new(),
        }
    }
}

impl OptimizationMetrics {
    /// Create a new builder for OptimizationMetrics
    pub fn builder() -> OptimizationMetricsBuilder {
        OptimizationMetricsBuilder::default()
    }

    /// Calculate compression ratio (optimized / original)
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.optimized_size as f64 / self.original_size as f64
        }
    }

    /// Calculate bytes saved by optimization (negative if the image grew)
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.optimized_size as i64
    }

    /// Calculate percentage saved (can be negative if image grew)
    pub fn percentage_saved(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            (self.bytes_saved() as f64 / self.original_size as f64) * 100.0
        }
    }

    /// Check if the image was resized
    pub fn was_resized(&self) -> bool {
        self.original_dimensions != self.optimized_dimensions
    }
}

/// Builder for OptimizationMetrics
#[derive(Debug, Clone, Default)]
pub struct OptimizationMetricsBuilder {
    original_size: usize,
    optimized_size: usize,
    original_dimensions: Option<Dimensions>,
    optimized_dimensions: Option<Dimensions>,
    output_format: Option<OutputFormat>,
    processing_time: Duration,
    transformations: Vec<TransformationType>,
}

impl OptimizationMetricsBuilder {
    pub fn original_size(mut self, size: usize) -> Self {
        self.original_size = size;
        self
    }

    pub fn optimized_size(mut self, size: usize) -> Self {
        self.optimized_size = size;
        self
    }

    pub fn original_dimensions(mut self, dims: Dimensions) -> Self {
        self.original_dimensions = Some(dims);
        self
    }

    pub fn optimized_dimensions(mut self, dims: Dimensions) -> Self {
        self.optimized_dimensions = Some(dims);
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn processing_time(mut self, time: Duration) -> Self {
        self.processing_time = time;
        self
    }

    /// Add a transformation
    pub fn transformation(mut self, t: TransformationType) -> Self {
        self.transformations.push(t);
        self
    }

    pub fn build(self) -> OptimizationMetrics {
        let original_dimensions = self.original_dimensions.unwrap_or(Dimensions::new(0, 0));
        OptimizationMetrics {
            original_size: self.original_size,
            optimized_size: self.optimized_size,
            original_dimensions,
            // Unset output dimensions mean nothing was resized
            optimized_dimensions: self.optimized_dimensions.unwrap_or(original_dimensions),
            output_format: self.output_format.unwrap_or(OutputFormat::Jpeg),
            processing_time: self.processing_time,
            transformations: self.transformations,
        }
    }
}

/// Aggregate figures for a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub images: usize,
    pub resized: usize,
    pub original_bytes: u64,
    pub optimized_bytes: u64,
    /// Sum of per-image processing time; exceeds wall time when images overlap
    pub processing_time_ms: u64,
}

impl BatchSummary {
    pub fn from_metrics<'a>(metrics: impl IntoIterator<Item = &'a OptimizationMetrics>) -> Self {
        metrics
            .into_iter()
            .fold(Self::default(), |mut summary, m| {
                summary.images += 1;
                if m.was_resized() {
                    summary.resized += 1;
                }
                summary.original_bytes += m.original_size as u64;
                summary.optimized_bytes += m.optimized_size as u64;
                summary.processing_time_ms += m.processing_time.as_millis() as u64;
                summary
            })
    }

    pub fn bytes_saved(&self) -> i64 {
        self.original_bytes as i64 - self.optimized_bytes as i64
    }

    pub fn percentage_saved(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            (self.bytes_saved() as f64 / self.original_bytes as f64) * 100.0
        }
    }
}
