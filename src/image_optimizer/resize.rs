//! Bounded resize
//!
//! The policy bounds are a ceiling: images already inside them pass through
//! untouched, larger ones are scaled by a single ratio so the aspect ratio is
//! kept (up to independent rounding of each side).

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, RgbaImage};
use std::num::NonZeroU32;

use super::error::ImageError;
use super::payload::Dimensions;
use super::policy::ResampleFilter;

/// Compute output dimensions for `source` under a `max_width` x `max_height`
/// ceiling
///
/// Each side is scaled by `min(max_width / width, max_height / height)` and
/// rounded to the nearest integer (halves away from zero), then clamped to
/// `[1, bound]`.
pub fn fit_within(source: Dimensions, max_width: u32, max_height: u32) -> Dimensions {
    if source.fits_within(max_width, max_height) {
        return source;
    }

    let ratio = f64::min(
        max_width as f64 / source.width as f64,
        max_height as f64 / source.height as f64,
    );

    let width = ((source.width as f64 * ratio).round() as u32).clamp(1, max_width.max(1));
    let height = ((source.height as f64 * ratio).round() as u32).clamp(1, max_height.max(1));

    Dimensions::new(width, height)
}

impl ResampleFilter {
    fn filter_type(&self) -> FilterType {
        match self {
            ResampleFilter::Bilinear => FilterType::Bilinear,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Draw `img` into a new RGBA surface of `target` size
///
/// Sources with an alpha channel are resampled premultiplied, so transparent
/// pixels do not darken the colour of opaque edges.
///
/// # Errors
/// * `ContextUnavailable` if either surface cannot be created or drawn into
pub fn resize_image(
    img: &DynamicImage,
    target: Dimensions,
    filter: ResampleFilter,
) -> Result<RgbaImage, ImageError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| ImageError::context_unavailable("source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::context_unavailable("source height is 0"))?;
    let dst_width = NonZeroU32::new(target.width)
        .ok_or_else(|| ImageError::context_unavailable("target width is 0"))?;
    let dst_height = NonZeroU32::new(target.height)
        .ok_or_else(|| ImageError::context_unavailable("target height is 0"))?;

    let has_alpha = img.color().has_alpha();
    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| {
        ImageError::context_unavailable(format!("failed to create source surface: {:?}", e))
    })?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mul_div = MulDiv::default();
    if has_alpha {
        mul_div
            .multiply_alpha_inplace(&mut src_image.view_mut())
            .map_err(|e| {
                ImageError::context_unavailable(format!("failed to premultiply alpha: {:?}", e))
            })?;
    }

    let mut resizer = Resizer::new(ResizeAlg::Convolution(filter.filter_type()));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::context_unavailable(format!("resize failed: {:?}", e)))?;

    if has_alpha {
        mul_div
            .divide_alpha_inplace(&mut dst_image.view_mut())
            .map_err(|e| {
                ImageError::context_unavailable(format!("failed to unpremultiply alpha: {:?}", e))
            })?;
    }

    RgbaImage::from_raw(target.width, target.height, dst_image.into_vec())
        .ok_or_else(|| ImageError::context_unavailable("failed to create output surface"))
}
