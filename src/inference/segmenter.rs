//! Foreground segmentation capability used by primary background removal.

use image::{GrayImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Segmentation model failed: {0}")]
    Inference(String),
    #[error("Mask is {mask_width}x{mask_height}, image is {width}x{height}")]
    MaskSize {
        mask_width: u32,
        mask_height: u32,
        width: u32,
        height: u32,
    },
}

/// A loaded foreground segmentation model.
///
/// Returns a foreground mask where 255 is fully foreground and 0 is
/// background. The mask must have the same dimensions as the input.
/// Shared read-only across pipelines like [`Classifier`](super::Classifier).
pub trait Segmenter: Send + Sync {
    fn describe(&self) -> String;

    fn segment(&self, image: &RgbaImage) -> Result<GrayImage, SegmentationError>;
}
