//! Pure calculation functions over pixels and score vectors.
//!
//! All functions here are pure and testable without decoding any image.

use super::params::Dimensions;

/// Empirical RGB skin-tone rule.
///
/// A pixel counts as skin when `R>95, G>40, B>20, R>G, R>B` and `R-G>15`.
///
/// # Examples
/// ```
/// # use clothing_service::imaging::calculations::is_skin;
/// assert!(is_skin(220, 180, 150));
/// assert!(!is_skin(50, 50, 100));
/// ```
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    r > 95 && g > 40 && b > 20 && r > g && r > b && r - g > 15
}

/// Fraction of RGB triplets in `samples` that match [`is_skin`].
///
/// `samples` is an interleaved buffer with `channels` bytes per pixel; only the
/// first three channels are inspected. Returns 0.0 for an empty buffer.
pub fn skin_ratio(samples: &[u8], channels: usize) -> f64 {
    let total = samples.len() / channels;
    if total == 0 {
        return 0.0;
    }
    let skin = samples
        .chunks_exact(channels)
        .filter(|px| is_skin(px[0], px[1], px[2]))
        .count();
    skin as f64 / total as f64
}

/// Mean of the per-channel means over the R, G and B channels.
///
/// Alpha, if present, is ignored. Returns 0.0 for an empty buffer.
pub fn mean_brightness(samples: &[u8], channels: usize) -> f64 {
    let total = samples.len() / channels;
    if total == 0 {
        return 0.0;
    }
    let sum: u64 = samples
        .chunks_exact(channels)
        .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
        .sum();
    sum as f64 / (total as f64 * 3.0)
}

/// Width divided by height.
pub fn aspect_ratio(dims: Dimensions) -> f64 {
    dims.width as f64 / dims.height as f64
}

/// True when all three color channels exceed `threshold`.
pub fn is_near_white(r: u8, g: u8, b: u8, threshold: u8) -> bool {
    r > threshold && g > threshold && b > threshold
}

/// Index of the largest score. Ties resolve to the lowest index.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Largest softmax probability, clamped to `[0, 1]`.
pub fn peak_probability(scores: &[f32]) -> f32 {
    softmax(scores)
        .into_iter()
        .fold(0.0_f32, f32::max)
        .clamp(0.0, 1.0)
}

/// Truncate (or zero-pad) a raw feature vector to exactly `dim` values.
pub fn fit_embedding(raw: &[f32], dim: usize) -> Vec<f32> {
    let mut embedding: Vec<f32> = raw.iter().take(dim).copied().collect();
    embedding.resize(dim, 0.0);
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skin_rule_canonical_tone() {
        assert!(is_skin(220, 180, 150));
    }

    #[test]
    fn skin_rule_requires_red_dominance() {
        // R-G exactly 15 is not enough
        assert!(!is_skin(115, 100, 50));
        assert!(is_skin(116, 100, 50));
        // Blue above red
        assert!(!is_skin(200, 100, 210));
    }

    #[test]
    fn skin_rule_rejects_dark_pixels() {
        assert!(!is_skin(95, 41, 21));
        assert!(!is_skin(200, 40, 30));
        assert!(!is_skin(200, 100, 20));
    }

    #[test]
    fn skin_ratio_counts_pixels_not_bytes() {
        let samples = [220, 180, 150, 50, 50, 100, 220, 180, 150, 0, 0, 0];
        assert_eq!(skin_ratio(&samples, 3), 0.5);
    }

    #[test]
    fn skin_ratio_ignores_alpha() {
        let samples = [220, 180, 150, 0, 50, 50, 100, 255];
        assert_eq!(skin_ratio(&samples, 4), 0.5);
    }

    #[test]
    fn skin_ratio_empty_is_zero() {
        assert_eq!(skin_ratio(&[], 3), 0.0);
    }

    #[test]
    fn brightness_averages_channels() {
        let samples = [255, 255, 255, 0, 0, 0];
        assert_eq!(mean_brightness(&samples, 3), 127.5);
        let samples = [30, 60, 90, 0];
        assert_eq!(mean_brightness(&samples, 4), 60.0);
    }

    #[test]
    fn aspect_ratio_portrait_below_one() {
        assert_eq!(aspect_ratio(Dimensions::new(60, 100)), 0.6);
        assert_eq!(aspect_ratio(Dimensions::new(100, 100)), 1.0);
    }

    #[test]
    fn near_white_is_strict() {
        assert!(is_near_white(241, 241, 241, 240));
        assert!(!is_near_white(240, 255, 255, 240));
        assert!(!is_near_white(255, 0, 0, 240));
    }

    #[test]
    fn argmax_picks_first_of_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_survives_large_logits() {
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn peak_probability_uniform() {
        let peak = peak_probability(&[0.0; 4]);
        assert!((peak - 0.25).abs() < 1e-6);
        assert_eq!(peak_probability(&[]), 0.0);
    }

    #[test]
    fn fit_embedding_truncates() {
        let raw: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(fit_embedding(&raw, 4), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn fit_embedding_pads_short_vectors() {
        assert_eq!(fit_embedding(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
    }
}
