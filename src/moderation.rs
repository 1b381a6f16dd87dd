//! Moderation heuristic engine.
//!
//! A coarse, non-adversarial content screen built from two signals:
//!
//! - **Skin ratio**: fraction of pixels matching the empirical RGB skin rule
//!   ([`is_skin`](crate::imaging::calculations::is_skin)).
//! - **Brightness**: mean of the R, G and B channel means.
//!
//! With `T` the configured `nsfw_threshold`, the rules are checked in order
//! and the first one that fires is the only reason recorded:
//!
//! | Rule | Condition | Reason |
//! |---|---|---|
//! | [`HighSkinRatio`](ModerationRule::HighSkinRatio) | `skin > T` | `high skin ratio` |
//! | [`BrightSkin`](ModerationRule::BrightSkin) | `skin > T-0.2` and `brightness > 150` | `moderate skin ratio with high brightness` |
//! | [`TallSkin`](ModerationRule::TallSkin) | `skin > T-0.1` and `width/height < 0.7` | `narrow/tall aspect with elevated skin ratio` |
//!
//! False positives and negatives are expected. The engine never raises:
//! [`ModerationEngine::screen`] returns a [`ModerationOutcome`] and the caller
//! decides whether a block becomes a rejection.

use crate::config::ModerationConfig;
use crate::imaging::calculations::{aspect_ratio, mean_brightness, skin_ratio};
use crate::imaging::{DecodedImage, Dimensions};
use serde::Serialize;

/// Brightness above which a moderate skin ratio is treated as suspicious.
pub const BRIGHTNESS_LIMIT: f64 = 150.0;
/// Width/height below which an elevated skin ratio is treated as suspicious.
pub const TALL_ASPECT_LIMIT: f64 = 0.7;

const BLOCKED_MESSAGE: &str = "Image rejected: inappropriate content detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationRule {
    HighSkinRatio,
    BrightSkin,
    TallSkin,
}

impl ModerationRule {
    pub fn reason(self) -> &'static str {
        match self {
            ModerationRule::HighSkinRatio => "high skin ratio",
            ModerationRule::BrightSkin => "moderate skin ratio with high brightness",
            ModerationRule::TallSkin => "narrow/tall aspect with elevated skin ratio",
        }
    }
}

/// First rule that fires for the given signals, if any.
pub fn triggered_rule(
    skin_ratio: f64,
    brightness: f64,
    aspect: f64,
    threshold: f64,
) -> Option<ModerationRule> {
    if skin_ratio > threshold {
        Some(ModerationRule::HighSkinRatio)
    } else if skin_ratio > threshold - 0.2 && brightness > BRIGHTNESS_LIMIT {
        Some(ModerationRule::BrightSkin)
    } else if skin_ratio > threshold - 0.1 && aspect < TALL_ASPECT_LIMIT {
        Some(ModerationRule::TallSkin)
    } else {
        None
    }
}

/// Outcome of the heuristic for one image.
///
/// `reasons` is non-empty exactly when `is_safe` is false, and `confidence`
/// equals `skin_ratio` for unsafe verdicts and 0.0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationVerdict {
    pub is_safe: bool,
    pub reasons: Vec<String>,
    pub skin_ratio: f64,
    pub brightness: f64,
    pub confidence: f64,
    /// False when moderation is disabled and no signal was computed.
    pub checked: bool,
}

impl ModerationVerdict {
    /// Verdict reported when moderation is switched off.
    pub fn unchecked() -> Self {
        Self {
            is_safe: true,
            reasons: Vec::new(),
            skin_ratio: 0.0,
            brightness: 0.0,
            confidence: 0.0,
            checked: false,
        }
    }

    /// Reasons joined for display, e.g. in a rejection.
    pub fn joined_reasons(&self) -> String {
        self.reasons.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModerationOutcome {
    /// Safe, or unsafe under a non-blocking policy; the caller may still act on it.
    Passed(ModerationVerdict),
    /// Unsafe under the `block_nsfw` policy.
    Blocked {
        message: String,
        reason: String,
        confidence: f64,
        verdict: ModerationVerdict,
    },
}

#[derive(Debug, Clone)]
pub struct ModerationEngine {
    config: ModerationConfig,
}

impl ModerationEngine {
    pub fn new(config: ModerationConfig) -> Self {
        Self { config }
    }

    /// Compute signals and apply the rules. Ignores `enabled` and `block_nsfw`.
    pub fn evaluate(&self, image: &DecodedImage) -> ModerationVerdict {
        let channels = image.layout().channels() as usize;
        let samples = image.samples();
        let skin = skin_ratio(samples, channels);
        let brightness = mean_brightness(samples, channels);
        self.verdict_for(skin, brightness, image.dimensions())
    }

    /// Apply the rules to precomputed signals.
    pub fn verdict_for(&self, skin: f64, brightness: f64, dims: Dimensions) -> ModerationVerdict {
        let rule = triggered_rule(
            skin,
            brightness,
            aspect_ratio(dims),
            self.config.nsfw_threshold,
        );
        let verdict = ModerationVerdict {
            is_safe: rule.is_none(),
            reasons: rule.map(|r| r.reason().to_string()).into_iter().collect(),
            skin_ratio: skin,
            brightness,
            confidence: if rule.is_some() { skin } else { 0.0 },
            checked: true,
        };
        tracing::debug!(
            skin_ratio = verdict.skin_ratio,
            brightness = verdict.brightness,
            is_safe = verdict.is_safe,
            "moderation signals"
        );
        verdict
    }

    /// Evaluate under the configured policy.
    pub fn screen(&self, image: &DecodedImage) -> ModerationOutcome {
        if !self.config.enabled {
            return ModerationOutcome::Passed(ModerationVerdict::unchecked());
        }
        let verdict = self.evaluate(image);
        if verdict.is_safe || !self.config.block_nsfw {
            return ModerationOutcome::Passed(verdict);
        }
        tracing::info!(
            reason = %verdict.joined_reasons(),
            confidence = verdict.confidence,
            "image blocked by moderation"
        );
        ModerationOutcome::Blocked {
            message: BLOCKED_MESSAGE.to_string(),
            reason: verdict.joined_reasons(),
            confidence: verdict.confidence,
            verdict,
        }
    }
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new(ModerationConfig::default())
    }
}
