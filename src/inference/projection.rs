//! Built-in classifier: pooled color features through a fixed random projection.
//!
//! ## Pipeline
//!
//! | Step | Crate / function |
//! |---|---|
//! | Resize to `input_size²` | `image::imageops::resize` with `Triangle` filter |
//! | Pool | mean R, G, B over a 7×7 grid, centered on 0 (147 features) |
//! | Project | dense `num_classes × 147` matrix, weights from `ChaCha8Rng` |
//!
//! The weights are generated once at construction from a fixed seed and are
//! never mutated afterwards, so the classifier can be shared freely across
//! threads and produces identical output for identical pixels on every
//! platform. It stands in for a trained backbone: the labels it produces are
//! stable but carry no semantic meaning.

use super::classifier::{Classifier, ClassifierOutput};
use crate::imaging::InputSize;
use crate::imaging::calculations::argmax;
use image::RgbImage;
use image::imageops::{self, FilterType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const GRID: u32 = 7;
const FEATURES: usize = (GRID * GRID * 3) as usize;

pub struct ProjectionClassifier {
    input_size: InputSize,
    num_classes: usize,
    /// Row-major `num_classes × FEATURES`.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl ProjectionClassifier {
    pub fn new(input_size: InputSize, num_classes: usize, seed: u64) -> Self {
        let num_classes = num_classes.max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Uniform(-1, 1) scaled so logits stay in a softmax-friendly range
        let scale = 1.0 / (FEATURES as f32).sqrt();
        let weights = (0..num_classes * FEATURES)
            .map(|_| rng.gen_range(-1.0_f32..1.0) * scale * 4.0)
            .collect();
        let bias = (0..num_classes)
            .map(|_| rng.gen_range(-0.1_f32..0.1))
            .collect();
        Self {
            input_size,
            num_classes,
            weights,
            bias,
        }
    }

    /// Mean of each channel over a `GRID × GRID` partition, mapped to `[-0.5, 0.5]`.
    fn pooled_features(&self, image: &RgbImage) -> Vec<f32> {
        let side = self.input_size.value();
        let resized = imageops::resize(image, side, side, FilterType::Triangle);

        let mut sums = vec![0.0_f32; FEATURES];
        let mut counts = vec![0u32; (GRID * GRID) as usize];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let cell = ((y * GRID / side) * GRID + x * GRID / side) as usize;
            counts[cell] += 1;
            for c in 0..3 {
                sums[cell * 3 + c] += pixel[c] as f32 / 255.0;
            }
        }
        sums.iter()
            .enumerate()
            .map(|(i, &sum)| match counts[i / 3] {
                0 => 0.0,
                n => sum / n as f32 - 0.5,
            })
            .collect()
    }
}

impl Classifier for ProjectionClassifier {
    fn describe(&self) -> String {
        format!(
            "projection-{}x{} ({} classes)",
            self.input_size.value(),
            self.input_size.value(),
            self.num_classes
        )
    }

    fn classify(&self, image: &RgbImage) -> ClassifierOutput {
        let features = self.pooled_features(image);
        let logits: Vec<f32> = self
            .weights
            .chunks_exact(FEATURES)
            .zip(&self.bias)
            .map(|(row, bias)| row.iter().zip(&features).map(|(w, f)| w * f).sum::<f32>() + bias)
            .collect();
        ClassifierOutput {
            class_index: argmax(&logits),
            // Class scores double as the raw feature vector, as with a
            // classification head's output layer.
            features: logits.clone(),
            logits,
        }
    }
}
