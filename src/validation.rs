//! Validation gate: structural checks every upload passes first.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. The bytes decode as a whitelisted container (JPEG, PNG, WebP).
//! 2. Width and height are both at least `min_dimension` (default 50 px).
//! 3. The encoded length is at most `max_bytes` (default 10 MiB).
//!
//! A passing image comes back normalized to RGB or RGBA.

use crate::config::ValidationConfig;
use crate::imaging::{DecodedImage, ImageCodec};
use crate::rejection::RejectionError;

#[derive(Debug, Clone)]
pub struct ValidationGate {
    codec: ImageCodec,
    config: ValidationConfig,
}

impl ValidationGate {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            codec: ImageCodec::new(),
            config,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
    pub fn validate(&self, bytes: &[u8]) -> Result<DecodedImage, RejectionError> {
        let image = self.codec.decode(bytes)?;

        let dims = image.dimensions();
        let min = self.config.min_dimension;
        if dims.width < min || dims.height < min {
            return Err(RejectionError::invalid(format!(
                "image too small ({dims}); minimum {min}x{min} pixels required"
            )));
        }

        if bytes.len() > self.config.max_bytes {
            return Err(RejectionError::invalid(format!(
                "image too large ({} bytes); maximum {} bytes",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(%dims, format = image.format().name(), "image passed validation");
        Ok(image)
    }
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
