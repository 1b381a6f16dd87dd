//! Background removal.
//!
//! Two strategies sit behind one [`RemovalStrategy::apply`] call, chosen once
//! when the service starts:
//!
//! - **Primary**: a [`Segmenter`] predicts a foreground mask, which becomes
//!   the alpha channel.
//! - **Fallback**: every pixel whose R, G and B all exceed `white_threshold`
//!   (default 240) becomes fully transparent. Crude, but needs no model.
//!
//! Output is always RGBA, and the result records which strategy ran so
//! callers can tell the quality tiers apart.

use crate::imaging::calculations::is_near_white;
use crate::imaging::{ChannelLayout, DecodedImage, Dimensions, ImageCodec};
use crate::inference::{SegmentationError, Segmenter};
use crate::rejection::RejectionError;
use image::RgbaImage;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalMethod {
    Primary,
    Fallback,
}

impl RemovalMethod {
    pub fn name(self) -> &'static str {
        match self {
            RemovalMethod::Primary => "primary",
            RemovalMethod::Fallback => "fallback",
        }
    }
}

#[derive(Clone)]
pub enum RemovalStrategy {
    Primary(Arc<dyn Segmenter>),
    Fallback { white_threshold: u8 },
}

impl RemovalStrategy {
    /// Primary when a segmentation model is available, fallback otherwise.
    pub fn select(segmenter: Option<Arc<dyn Segmenter>>, white_threshold: u8) -> Self {
        match segmenter {
            Some(segmenter) => {
                tracing::info!(
                    model = %segmenter.describe(),
                    "background removal: primary strategy"
                );
                RemovalStrategy::Primary(segmenter)
            }
            None => {
                tracing::warn!(
                    white_threshold,
                    "no segmentation model; background removal uses the near-white fallback"
                );
                RemovalStrategy::Fallback { white_threshold }
            }
        }
    }

    pub fn method(&self) -> RemovalMethod {
        match self {
            RemovalStrategy::Primary(_) => RemovalMethod::Primary,
            RemovalStrategy::Fallback { .. } => RemovalMethod::Fallback,
        }
    }

    /// Make the background of `image` transparent.
    pub fn apply(&self, mut image: RgbaImage) -> Result<RgbaImage, RejectionError> {
        match self {
            RemovalStrategy::Primary(segmenter) => {
                let mask = segmenter.segment(&image).map_err(segmentation_failed)?;
                if mask.dimensions() != image.dimensions() {
                    return Err(segmentation_failed(SegmentationError::MaskSize {
                        mask_width: mask.width(),
                        mask_height: mask.height(),
                        width: image.width(),
                        height: image.height(),
                    }));
                }
                for (pixel, weight) in image.pixels_mut().zip(mask.pixels()) {
                    pixel[3] = ((pixel[3] as u16 * weight[0] as u16) / 255) as u8;
                }
            }
            RemovalStrategy::Fallback { white_threshold } => {
                for pixel in image.pixels_mut() {
                    if is_near_white(pixel[0], pixel[1], pixel[2], *white_threshold) {
                        pixel[3] = 0;
                    }
                }
            }
        }
        Ok(image)
    }
}

fn segmentation_failed(err: SegmentationError) -> RejectionError {
    RejectionError::failed(err.to_string())
}

/// Transparent-background bitmap plus what produced it.
#[derive(Debug, Clone)]
pub struct RemovalResult {
    pub image: RgbaImage,
    pub method: RemovalMethod,
    pub original_size: Dimensions,
    pub original_layout: ChannelLayout,
}

impl RemovalResult {
    pub fn processed_size(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    pub fn metadata(&self) -> RemovalMetadata {
        RemovalMetadata {
            original_size: self.original_size,
            processed_size: self.processed_size(),
            original_mode: self.original_layout,
            processed_mode: ChannelLayout::Rgba,
            has_transparency: true,
            method: self.method,
        }
    }
}

/// Description of a removal, handed back alongside the PNG bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovalMetadata {
    pub original_size: Dimensions,
    pub processed_size: Dimensions,
    pub original_mode: ChannelLayout,
    pub processed_mode: ChannelLayout,
    /// The output carries an alpha channel.
    pub has_transparency: bool,
    pub method: RemovalMethod,
}

impl RemovalMetadata {
    /// Response header pairs for an HTTP-style caller.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("X-Original-Size", self.original_size.to_string()),
            ("X-Processed-Size", self.processed_size.to_string()),
            ("X-Has-Transparency", self.has_transparency.to_string()),
            ("X-Removal-Method", self.method.name().to_string()),
        ]
    }
}

/// Background removal processor.
#[derive(Clone)]
pub struct BackgroundRemover {
    strategy: RemovalStrategy,
    codec: ImageCodec,
}

impl BackgroundRemover {
    pub fn new(strategy: RemovalStrategy) -> Self {
        Self {
            strategy,
            codec: ImageCodec::new(),
        }
    }

    pub fn method(&self) -> RemovalMethod {
        self.strategy.method()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(method = self.method().name()))]
    pub fn remove(&self, image: &DecodedImage) -> Result<RemovalResult, RejectionError> {
        let processed = self.strategy.apply(image.to_rgba8())?;
        Ok(RemovalResult {
            image: processed,
            method: self.method(),
            original_size: image.dimensions(),
            original_layout: image.layout(),
        })
    }

    /// Encode a result as PNG and describe it.
    pub fn encode(
        &self,
        result: &RemovalResult,
    ) -> Result<(Vec<u8>, RemovalMetadata), RejectionError> {
        let png = self.codec.encode_png(&result.image)?;
        Ok((png, result.metadata()))
    }
}
