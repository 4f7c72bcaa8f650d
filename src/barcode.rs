//! Barcode extraction collaborators.
//!
//! Rasterization and symbol decoding live behind traits; the core owns only
//! the glue between them: converting a raw pixel buffer into an image the
//! decoder accepts, and turning decoded byte payloads into strings.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::error::{Error, Result};

/// A raw per-page pixel buffer produced by a [`crate::source::Rasterizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Samples per pixel. 4 or more implies an alpha channel.
    pub channels: u8,
    /// Whether the buffer carries a color space (false means grayscale).
    pub has_colorspace: bool,
    /// Interleaved sample bytes, row-major.
    pub samples: Vec<u8>,
}

impl Pixmap {
    /// Create a pixmap from its parts.
    pub fn new(width: u32, height: u32, channels: u8, has_colorspace: bool, samples: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            has_colorspace,
            samples,
        }
    }
}

/// Decodes barcode symbols out of an image.
pub trait BarcodeDecoder {
    /// Ordered decoded byte payloads, top to bottom. An image with no
    /// recognizable symbols yields an empty list, not an error.
    fn decode(&self, image: &DynamicImage) -> Result<Vec<Vec<u8>>>;
}

/// Convert a raw pixel buffer into an image the decoder accepts.
///
/// Four or more channels imply alpha, which is flattened to RGB before
/// decode. Three channels map to RGB; a colorspace-less buffer maps to
/// grayscale. Dimension or buffer-length mismatches are errors.
pub fn pixmap_to_image(pixmap: &Pixmap) -> Result<DynamicImage> {
    if pixmap.width == 0 || pixmap.height == 0 {
        return Err(Error::Image(format!(
            "invalid image dimensions: {}x{}",
            pixmap.width, pixmap.height
        )));
    }

    let expected_channels: u32 = if pixmap.channels >= 4 {
        4
    } else if pixmap.has_colorspace {
        3
    } else {
        1
    };
    let expected_len = pixmap.width as usize * pixmap.height as usize * expected_channels as usize;
    if pixmap.samples.len() != expected_len {
        return Err(Error::Image(format!(
            "sample buffer is {} bytes, expected {} for {}x{}x{}",
            pixmap.samples.len(),
            expected_len,
            pixmap.width,
            pixmap.height,
            expected_channels
        )));
    }

    let samples = pixmap.samples.clone();
    let image = match expected_channels {
        4 => RgbaImage::from_raw(pixmap.width, pixmap.height, samples)
            .map(DynamicImage::ImageRgba8)
            // Alpha present: flatten to a 3-channel representation.
            .map(|img| DynamicImage::ImageRgb8(img.to_rgb8())),
        3 => RgbImage::from_raw(pixmap.width, pixmap.height, samples)
            .map(DynamicImage::ImageRgb8),
        _ => GrayImage::from_raw(pixmap.width, pixmap.height, samples)
            .map(DynamicImage::ImageLuma8),
    };

    image.ok_or_else(|| Error::Image("sample buffer does not match dimensions".to_string()))
}

/// Decode a payload as UTF-8, ignoring invalid byte sequences.
pub fn payload_to_string(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if let Ok(valid) = std::str::from_utf8(&bytes[..valid_up_to]) {
                    out.push_str(valid);
                }
                let skip = match e.error_len() {
                    Some(len) => valid_up_to + len,
                    None => return out,
                };
                bytes = &bytes[skip..];
            }
        }
    }
}
