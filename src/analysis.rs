//! Attribute and embedding extraction.
//!
//! Turns a validated image into a catalog record. The [`Classifier`] supplies a
//! class index, class scores and a raw feature vector; everything else is
//! derived from those:
//!
//! | Field | Source |
//! |---|---|
//! | `type` | `clothing_types[class_index % len]` |
//! | `styles`, `color`, `size`, `material`, `pattern` | [`SeededSelector`] seeded by the class index |
//! | `name` | `"{material} {color}"` |
//! | `embedding` | raw features cut (or zero-padded) to `embedding_dimensions` |
//! | `confidence` | peak softmax probability of the class scores |
//!
//! Given a [`DecodedImage`] this stage cannot fail.

use crate::config::{CatalogConfig, FALLBACK_SIZES, ModelConfig};
use crate::imaging::DecodedImage;
use crate::imaging::calculations::{fit_embedding, peak_probability};
use crate::inference::Classifier;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;

/// Catalog record for one clothing photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClothingAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub clothing_type: String,
    pub color: String,
    pub size: String,
    pub material: String,
    pub pattern: String,
    pub styles: Vec<String>,
    pub embedding: Vec<f32>,
    /// Left for the user to fill in.
    pub brand: Option<String>,
    pub confidence: f32,
}

/// Categorical picks for one class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelection {
    pub clothing_type: String,
    pub styles: Vec<String>,
    pub color: String,
    pub size: String,
    pub material: String,
    pub pattern: String,
}

/// Deterministic attribute picker.
///
/// Every selection draws from a fresh `ChaCha8Rng` seeded with
/// `class_index ^ salt`, so the same class index always yields the same
/// record, on every platform and regardless of call order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeededSelector {
    salt: u64,
}

impl SeededSelector {
    pub fn new(salt: u64) -> Self {
        Self { salt }
    }

    pub fn rng_for(&self, class_index: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(class_index as u64 ^ self.salt)
    }

    pub fn select(
        &self,
        class_index: usize,
        catalog: &CatalogConfig,
        min_styles: usize,
        max_styles: usize,
    ) -> AttributeSelection {
        let mut rng = self.rng_for(class_index);

        let clothing_type = catalog
            .clothing_types
            .get(class_index % catalog.clothing_types.len().max(1))
            .cloned()
            .unwrap_or_default();

        let max = max_styles.min(catalog.styles.len());
        let min = min_styles.max(1).min(max);
        let count = rng.gen_range(min..=max);
        let styles = catalog
            .styles
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect();

        let color = pick(&catalog.colors, &mut rng);
        let size = match catalog.sizes_for(&clothing_type) {
            Some(sizes) => pick(sizes, &mut rng),
            None => FALLBACK_SIZES
                .choose(&mut rng)
                .map(|s| s.to_string())
                .unwrap_or_default(),
        };
        let material = pick(&catalog.materials, &mut rng);
        let pattern = pick(&catalog.patterns, &mut rng);

        AttributeSelection {
            clothing_type,
            styles,
            color,
            size,
            material,
            pattern,
        }
    }
}

fn pick(values: &[String], rng: &mut ChaCha8Rng) -> String {
    values.choose(rng).cloned().unwrap_or_default()
}

/// Attribute/embedding processor.
#[derive(Clone)]
pub struct AttributeExtractor {
    classifier: Arc<dyn Classifier>,
    selector: SeededSelector,
    catalog: CatalogConfig,
    model: ModelConfig,
}

impl AttributeExtractor {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        catalog: CatalogConfig,
        model: ModelConfig,
    ) -> Self {
        Self {
            classifier,
            selector: SeededSelector::default(),
            catalog,
            model,
        }
    }

    /// Replace the default selector, e.g. to pin a salt in tests.
    pub fn with_selector(mut self, selector: SeededSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(dims = %image.dimensions()))]
    pub fn extract(&self, image: &DecodedImage) -> ClothingAttributes {
        let output = self.classifier.classify(&image.to_rgb8());
        let selection = self.selector.select(
            output.class_index,
            &self.catalog,
            self.model.min_styles,
            self.model.max_styles,
        );
        if output.features.len() < self.model.embedding_dimensions {
            tracing::debug!(
                features = output.features.len(),
                dimensions = self.model.embedding_dimensions,
                "zero-padding short feature vector"
            );
        }
        let embedding = fit_embedding(&output.features, self.model.embedding_dimensions);
        let confidence = peak_probability(&output.logits);
        tracing::debug!(class_index = output.class_index, confidence, "classified");

        ClothingAttributes {
            name: format!("{} {}", selection.material, selection.color),
            clothing_type: selection.clothing_type,
            color: selection.color,
            size: selection.size,
            material: selection.material,
            pattern: selection.pattern,
            styles: selection.styles,
            embedding,
            brand: None,
            confidence,
        }
    }
}
