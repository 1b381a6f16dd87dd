//! Byte-level image codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff container | `image::guess_format` (magic bytes, not file extension) |
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory_with_format` (pure Rust decoders) |
//! | Normalize | `DynamicImage::into_rgb8` / `into_rgba8` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! Every decoded image is normalized to 8-bit RGB, or 8-bit RGBA when the
//! source carries an alpha channel, so downstream stages only ever see those
//! two layouts.

use super::params::{ChannelLayout, Dimensions, SourceFormat};
use crate::rejection::RejectionError;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

/// An in-memory bitmap in a canonical 3- or 4-channel layout.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: DynamicImage,
    format: SourceFormat,
    byte_len: usize,
}

impl DecodedImage {
    /// Wrap a decoded bitmap, normalizing its color mode.
    pub fn new(image: DynamicImage, format: SourceFormat, byte_len: usize) -> Self {
        let pixels = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.into_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.into_rgb8())
        };
        Self {
            pixels,
            format,
            byte_len,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn layout(&self) -> ChannelLayout {
        match self.pixels {
            DynamicImage::ImageRgba8(_) => ChannelLayout::Rgba,
            _ => ChannelLayout::Rgb,
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Length of the encoded input this image was decoded from.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Raw interleaved samples, `layout().channels()` bytes per pixel.
    pub fn samples(&self) -> &[u8] {
        self.pixels.as_bytes()
    }

    /// RGB copy; alpha is dropped, not composited.
    pub fn to_rgb8(&self) -> RgbImage {
        self.pixels.to_rgb8()
    }

    /// RGBA copy; RGB sources become fully opaque.
    pub fn to_rgba8(&self) -> RgbaImage {
        self.pixels.to_rgba8()
    }
}

/// Decoder/encoder for the accepted container formats.
///
/// Stateless; one instance can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Identify the container from its magic bytes and check it against the whitelist.
    pub fn sniff(&self, bytes: &[u8]) -> Result<SourceFormat, RejectionError> {
        let format = image::guess_format(bytes)
            .map_err(|e| RejectionError::invalid(format!("unrecognized image data: {e}")))?;
        SourceFormat::from_image_format(format).ok_or_else(|| {
            RejectionError::invalid(format!(
                "unsupported image format: {}",
                format
                    .extensions_str()
                    .first()
                    .copied()
                    .unwrap_or("unknown")
                    .to_uppercase()
            ))
        })
    }

    /// Decode raw bytes into a normalized bitmap.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, RejectionError> {
        let format = self.sniff(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format.image_format())
            .map_err(|e| {
                RejectionError::invalid(format!("cannot decode {} data: {e}", format.name()))
            })?;
        Ok(DecodedImage::new(image, format, bytes.len()))
    }

    /// Encode an RGBA bitmap as PNG.
    pub fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, RejectionError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| RejectionError::failed(format!("PNG encode failed: {e}")))?;
        Ok(out)
    }
}
