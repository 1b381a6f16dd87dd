//! Shared test utilities: synthetic images and their encodings.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let image = skin_fraction_image(100, 100, 0.8);
//! let decoded = decode(&png_bytes(&image));
//! assert_eq!(decoded.width(), 100);
//! ```

use crate::imaging::{DecodedImage, ImageCodec};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};

/// Canonical skin tone used by the moderation fixtures.
pub const SKIN: [u8; 3] = [220, 180, 150];
/// Dark blue background that never matches the skin rule.
pub const BACKGROUND: [u8; 3] = [50, 50, 100];

// =========================================================================
// Synthetic images
// =========================================================================

pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// `fraction` of the pixels (rounded, row-major from the top) set to [`SKIN`],
/// the rest to [`BACKGROUND`].
pub fn skin_fraction_image(width: u32, height: u32, fraction: f64) -> RgbImage {
    let skin_pixels = ((width * height) as f64 * fraction).round() as u32;
    RgbImage::from_fn(width, height, |x, y| {
        if y * width + x < skin_pixels {
            Rgb(SKIN)
        } else {
            Rgb(BACKGROUND)
        }
    })
}

/// 100×100 white image with a 20×20 red square at the center.
pub fn white_with_red_square() -> RgbImage {
    RgbImage::from_fn(100, 100, |x, y| {
        if (40..60).contains(&x) && (40..60).contains(&y) {
            Rgb([255, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

// =========================================================================
// Encoding
// =========================================================================

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(image.clone()))
}

pub fn encode_jpeg(image: &RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 95)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .unwrap();
    out
}

/// Decode bytes that are known to be valid.
pub fn decode(bytes: &[u8]) -> DecodedImage {
    ImageCodec::new().decode(bytes).unwrap()
}

/// Losslessly round-trip an RGB image through PNG into a [`DecodedImage`].
pub fn decoded_rgb(image: &RgbImage) -> DecodedImage {
    decode(&png_bytes(image))
}
