//! Classifier trait and shared output type.
//!
//! The [`Classifier`] trait is the one contract the attribute processor needs
//! from a model: image in, class scores and raw features out. The backbone
//! behind it is swappable; the built-in implementation is
//! [`ProjectionClassifier`](super::projection::ProjectionClassifier).

use image::RgbImage;

/// Result of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    /// Index of the highest-scoring class.
    pub class_index: usize,
    /// Unnormalized class scores. Softmax over these gives the probability
    /// distribution used for confidence.
    pub logits: Vec<f32>,
    /// Raw feature vector the embedding is cut from.
    pub features: Vec<f32>,
}

/// A loaded classification model.
///
/// Implementations are constructed once and shared read-only across
/// concurrent pipelines, hence the `Send + Sync` bound and `&self` receiver.
/// Resizing and normalization are the implementation's concern.
pub trait Classifier: Send + Sync {
    /// Short human-readable description, e.g. for health output.
    fn describe(&self) -> String;

    /// Classify an RGB image.
    fn classify(&self, image: &RgbImage) -> ClassifierOutput;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Classifier returning a canned output and counting calls.
    /// Uses Mutex (not RefCell) so it is Sync and can sit behind an Arc.
    pub struct FixedClassifier {
        pub output: ClassifierOutput,
        pub calls: Mutex<Vec<(u32, u32)>>,
    }

    impl FixedClassifier {
        pub fn new(class_index: usize, logits: Vec<f32>, features: Vec<f32>) -> Self {
            Self {
                output: ClassifierOutput {
                    class_index,
                    logits,
                    features,
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Class `class_index` with `len` ascending features.
        pub fn with_features(class_index: usize, len: usize) -> Self {
            let features: Vec<f32> = (0..len).map(|i| i as f32).collect();
            let mut logits = vec![0.0; 10];
            logits[class_index % 10] = 5.0;
            Self::new(class_index, logits, features)
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Classifier for FixedClassifier {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        fn classify(&self, image: &RgbImage) -> ClassifierOutput {
            self.calls
                .lock()
                .unwrap()
                .push((image.width(), image.height()));
            self.output.clone()
        }
    }

    #[test]
    fn fixed_classifier_records_calls() {
        let classifier = FixedClassifier::with_features(3, 200);
        let out = classifier.classify(&RgbImage::new(60, 70));
        assert_eq!(out.class_index, 3);
        assert_eq!(out.features.len(), 200);
        assert_eq!(classifier.call_count(), 1);
        assert_eq!(classifier.calls.lock().unwrap()[0], (60, 70));
    }
}
