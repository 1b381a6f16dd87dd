//! Shared value types for decoded images.
//!
//! These describe *what* an image is, not how it is processed. They travel
//! between the codec, the validation gate, the heuristics and the processors.
//!
//! ## Types
//!
//! - [`Dimensions`]: width and height in pixels, rendered as `WxH`.
//! - [`ChannelLayout`]: canonical sample layout after normalization (RGB or RGBA).
//! - [`SourceFormat`]: the container formats the codec accepts.
//! - [`InputSize`]: square side length images are resized to before classification.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The pair as `(width, height)`.
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Canonical channel layout of a [`DecodedImage`](super::DecodedImage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelLayout {
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(self) -> u8 {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelLayout::Rgb => "RGB",
            ChannelLayout::Rgba => "RGBA",
        }
    }
}

/// Container formats accepted at intake.
///
/// Anything the `image` crate recognizes but that is not listed here is
/// rejected as an invalid image, even if a decoder happens to be compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [SourceFormat::Jpeg, SourceFormat::Png, SourceFormat::WebP];

    /// Map a format sniffed by the `image` crate onto the whitelist.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            ImageFormat::Png => Some(SourceFormat::Png),
            ImageFormat::WebP => Some(SourceFormat::WebP),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::WebP => ImageFormat::WebP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::WebP => "WEBP",
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.image_format().to_mime_type()
    }
}

/// Side length of the square the classifier sees (default 224).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize(pub u32);

impl InputSize {
    pub fn new(value: u32) -> Self {
        Self(value.max(1))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self(224)
    }
}
