//! Image handling: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff + decode** | `image::guess_format` + pure-Rust JPEG/PNG/WebP decoders |
//! | **Normalize** | 8-bit RGB or RGBA |
//! | **Encode** | PNG (`image::codecs::png`) |
//!
//! The module is split into:
//! - **Params**: Value types shared by every stage ([`Dimensions`], [`SourceFormat`], ...)
//! - **Calculations**: Pure pixel and score math (unit testable)
//! - **Codec**: [`ImageCodec`] + [`DecodedImage`]

pub mod calculations;
pub mod codec;
mod params;

pub use codec::{DecodedImage, ImageCodec};
pub use params::{ChannelLayout, Dimensions, InputSize, SourceFormat};
