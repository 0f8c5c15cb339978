//! Optimization policy and partial overrides
//!
//! A policy is always fully resolved before any image work starts. Callers
//! pass a [`PolicyOverrides`] with only the fields they care about, which is
//! merged over [`OptimizationPolicy::default`] (or a configured base).
//!
//! Overrides can also be parsed from the compact option string used by the
//! CLI and configuration files:
//!
//! ```text
//! w:800,h:600,q:0.8,f:webp,filter:lanczos3
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::error::ImageError;

/// Default maximum output width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
/// Default maximum output height in pixels
pub const DEFAULT_MAX_HEIGHT: u32 = 1920;
/// Default encoder quality in (0, 1]
pub const DEFAULT_QUALITY: f32 = 0.85;
/// Default target encoding
pub const DEFAULT_FORMAT: OutputFormat = OutputFormat::Jpeg;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    #[serde(alias = "WebP")]
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// Media type of payloads encoded in this format
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// File name extension for this format
    pub fn extension(&self) -> &'static str {
        // Matches `as_str` on purpose: `photo.png` becomes `photo.jpeg`
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(ImageError::invalid_policy(
                "format",
                format!("unknown format: {}", s),
            )),
        }
    }
}

/// Resampling filter used when the image has to be scaled down
///
/// Only smooth filters are offered; nearest-neighbour is not an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Bilinear,
    /// Bicubic (Catmull-Rom spline)
    #[default]
    #[serde(alias = "bicubic")]
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bilinear => "bilinear",
            Self::CatmullRom => "catmull_rom",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bilinear" => Ok(ResampleFilter::Bilinear),
            "catmull_rom" | "catmullrom" | "bicubic" => Ok(ResampleFilter::CatmullRom),
            "lanczos3" | "lanczos" => Ok(ResampleFilter::Lanczos3),
            _ => Err(ImageError::invalid_policy(
                "filter",
                format!("unknown filter: {}", s),
            )),
        }
    }
}

/// Fully resolved optimization policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPolicy {
    /// Maximum output width in pixels
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum output height in pixels
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Encoder quality in (0, 1]
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// Target encoding
    #[serde(default)]
    pub format: OutputFormat,

    /// Resampling filter
    #[serde(default)]
    pub filter: ResampleFilter,
}

impl Default for OptimizationPolicy {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: DEFAULT_FORMAT,
            filter: ResampleFilter::default(),
        }
    }
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

fn default_quality() -> f32 {
    DEFAULT_QUALITY
}

impl OptimizationPolicy {
    /// Resolve overrides over the documented defaults
    pub fn resolve(overrides: Option<&PolicyOverrides>) -> Result<Self, ImageError> {
        Self::default().merge(overrides)
    }

    /// Resolve overrides over this policy
    pub fn merge(&self, overrides: Option<&PolicyOverrides>) -> Result<Self, ImageError> {
        let merged = match overrides {
            Some(o) => Self {
                max_width: o.max_width.unwrap_or(self.max_width),
                max_height: o.max_height.unwrap_or(self.max_height),
                quality: o.quality.unwrap_or(self.quality),
                format: o.format.unwrap_or(self.format),
                filter: o.filter.unwrap_or(self.filter),
            },
            None => *self,
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_width == 0 {
            return Err(ImageError::invalid_policy("max_width", "must be positive"));
        }
        if self.max_height == 0 {
            return Err(ImageError::invalid_policy("max_height", "must be positive"));
        }
        if !self.quality.is_finite() || self.quality <= 0.0 || self.quality > 1.0 {
            return Err(ImageError::invalid_policy(
                "quality",
                format!("{} is not in (0, 1]", self.quality),
            ));
        }
        Ok(())
    }
}

/// Partial policy: any subset of fields, merged over a base policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ResampleFilter>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields set in `other` win over fields set in `self`
    pub fn or(self, other: PolicyOverrides) -> Self {
        Self {
            max_width: other.max_width.or(self.max_width),
            max_height: other.max_height.or(self.max_height),
            quality: other.quality.or(self.quality),
            format: other.format.or(self.format),
            filter: other.filter.or(self.filter),
        }
    }

    fn from_options(options: &HashMap<String, String>) -> Result<Self, ImageError> {
        let mut result = Self::default();

        if let Some(w) = options.get("w") {
            result.max_width = Some(parse_bound("w", w)?);
        }

        if let Some(h) = options.get("h") {
            result.max_height = Some(parse_bound("h", h)?);
        }

        if let Some(q) = options.get("q") {
            result.quality = Some(parse_quality(q)?);
        }

        if let Some(fmt) = options.get("fmt").or_else(|| options.get("f")) {
            result.format = Some(fmt.parse()?);
        }

        if let Some(filter) = options.get("filter") {
            result.filter = Some(filter.parse()?);
        }

        Ok(result)
    }
}

/// Parse an encoder quality: a fraction in (0, 1], or a percentage in (1, 100]
pub fn parse_quality(value: &str) -> Result<f32, ImageError> {
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| ImageError::invalid_policy("q", "must be a number"))?;
    let quality = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(ImageError::invalid_policy("q", "must be in (0, 1]"));
    }
    Ok(quality)
}

fn parse_bound(param: &str, value: &str) -> Result<u32, ImageError> {
    let px: u32 = value
        .parse()
        .map_err(|_| ImageError::invalid_policy(param, "invalid pixel value"))?;
    if px == 0 {
        return Err(ImageError::invalid_policy(param, "must be positive"));
    }
    Ok(px)
}

impl FromStr for PolicyOverrides {
    type Err = ImageError;

    /// Parse `w:800,h:600,q:0.8,f:webp`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = HashMap::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part.split_once(':').ok_or_else(|| {
                ImageError::invalid_policy(part, "expected key:value")
            })?;
            options.insert(key.trim().to_string(), value.trim().to_string());
        }

        Self::from_options(&options)
    }
}
