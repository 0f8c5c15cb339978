//! EXIF orientation
//!
//! Cameras store the sensor image as-is and record how it should be shown in
//! the EXIF Orientation tag. The pipeline applies that tag after decoding so
//! bounds and output match what a viewer displays.

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use super::payload::Dimensions;

/// Display orientation, EXIF values 1 through 8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_exif_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    /// Read the orientation of a JPEG or WebP source
    ///
    /// Missing, unreadable or out-of-range tags mean `Normal`.
    pub fn read(data: &[u8], format: ImageFormat) -> Self {
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::WebP) {
            return Orientation::Normal;
        }

        let exif = match Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(_) => return Orientation::Normal,
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(Self::from_exif_value)
            .unwrap_or_default()
    }

    pub fn is_normal(&self) -> bool {
        *self == Orientation::Normal
    }

    /// Whether displaying the image swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90
                | Orientation::Transverse
                | Orientation::Rotate270
        )
    }

    /// Dimensions as displayed
    pub fn display_dimensions(&self, stored: Dimensions) -> Dimensions {
        if self.swaps_dimensions() {
            Dimensions::new(stored.height, stored.width)
        } else {
            stored
        }
    }

    /// Turn a decoded image upright
    pub fn apply(&self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Transpose => img.rotate90().fliph(),
            Orientation::Rotate90 => img.rotate90(),
            Orientation::Transverse => img.rotate270().fliph(),
            Orientation::Rotate270 => img.rotate270(),
        }
    }
}

/// Insert a minimal Exif APP1 segment carrying `orientation` into a JPEG
#[cfg(test)]
pub(crate) fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    // Big-endian TIFF header, one IFD entry: Orientation (0x0112), SHORT, count 1
    let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
    tiff.extend_from_slice(&[0x00, 0x01]);
    tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0x00, 0x00]);
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let length = (payload.len() + 2) as u16;

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}
