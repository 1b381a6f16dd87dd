//! The two public operations, wired from config and injected models.
//!
//! ```text
//! Analyze:           bytes → validate → moderate → extract      → AnalysisRecord
//! RemoveBackground:  bytes → validate → remove   → encode PNG   → RemovalOutput
//! ```
//!
//! Background removal does not consult moderation. [`ClothingService`] holds
//! only read-only state, so one instance can serve concurrent callers.

use crate::analysis::{AttributeExtractor, ClothingAttributes};
use crate::config::{ConfigError, ServiceConfig};
use crate::imaging::InputSize;
use crate::inference::{Classifier, ProjectionClassifier, Segmenter};
use crate::intake::{check_content_type, content_type_for_path, read_capped};
use crate::moderation::{ModerationEngine, ModerationOutcome, ModerationVerdict};
use crate::rejection::RejectionError;
use crate::removal::{BackgroundRemover, RemovalMetadata, RemovalMethod, RemovalStrategy};
use crate::validation::ValidationGate;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Moderation summary attached to an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModerationSummary {
    pub is_safe: bool,
    pub checked: bool,
}

/// Output of the analyze operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    #[serde(flatten)]
    pub attributes: ClothingAttributes,
    pub moderation: ModerationSummary,
}

/// Output of the remove-background operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalOutput {
    /// PNG-encoded RGBA image.
    pub png: Vec<u8>,
    pub metadata: RemovalMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub classifier: String,
    pub removal_method: RemovalMethod,
    pub features: Vec<&'static str>,
}

#[derive(Clone)]
pub struct ClothingService {
    config: ServiceConfig,
    gate: ValidationGate,
    moderation: ModerationEngine,
    extractor: AttributeExtractor,
    remover: BackgroundRemover,
}

impl ClothingService {
    /// Wire the pipelines around already-loaded models.
    ///
    /// The config is validated first, so a service never runs with an empty
    /// vocabulary or an impossible style count.
    pub fn new(
        config: ServiceConfig,
        classifier: Arc<dyn Classifier>,
        segmenter: Option<Arc<dyn Segmenter>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let white_threshold = config.background_removal.white_threshold;
        let strategy = RemovalStrategy::select(segmenter, white_threshold);
        Ok(Self {
            gate: ValidationGate::new(config.validation.clone()),
            moderation: ModerationEngine::new(config.moderation.clone()),
            extractor: AttributeExtractor::new(
                classifier,
                config.catalog.clone(),
                config.model.clone(),
            ),
            remover: BackgroundRemover::new(strategy),
            config,
        })
    }

    /// Service with the built-in classifier and no segmentation model.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ConfigError> {
        let classifier = ProjectionClassifier::new(
            InputSize::new(config.model.input_size),
            config.model.num_classes,
            config.model.weights_seed,
        );
        Self::new(config, Arc::new(classifier), None)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validate, moderate, then extract attributes.
    #[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisRecord, RejectionError> {
        let image = self.gate.validate(bytes)?;

        let verdict = match self.moderation.screen(&image) {
            ModerationOutcome::Passed(verdict) => verdict,
            ModerationOutcome::Blocked {
                message,
                reason,
                confidence,
                ..
            } => {
                return Err(RejectionError::ContentBlocked {
                    message,
                    reason,
                    confidence,
                });
            }
        };

        let attributes = self.extractor.extract(&image);
        tracing::info!(
            clothing_type = %attributes.clothing_type,
            confidence = attributes.confidence,
            "analysis complete"
        );
        Ok(AnalysisRecord {
            attributes,
            moderation: ModerationSummary {
                is_safe: verdict.is_safe,
                checked: verdict.checked,
            },
        })
    }

    /// [`analyze`](Self::analyze) preceded by the `image/*` content-type check.
    pub fn analyze_upload(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<AnalysisRecord, RejectionError> {
        check_content_type(content_type)?;
        self.analyze(bytes)
    }

    /// Validate and report the full moderation verdict without applying the
    /// block policy.
    pub fn moderate(&self, bytes: &[u8]) -> Result<ModerationVerdict, RejectionError> {
        let image = self.gate.validate(bytes)?;
        Ok(self.moderation.evaluate(&image))
    }

    /// Validate, strip the background, encode as PNG.
    #[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn remove_background(&self, bytes: &[u8]) -> Result<RemovalOutput, RejectionError> {
        let image = self.gate.validate(bytes)?;
        let result = self.remover.remove(&image)?;
        let (png, metadata) = self.remover.encode(&result)?;
        tracing::info!(
            method = metadata.method.name(),
            size = %metadata.processed_size,
            "background removed"
        );
        Ok(RemovalOutput { png, metadata })
    }

    /// Streamed variant: checks the content type, then reads the upload in
    /// chunks and aborts as soon as the size cap is passed.
    pub fn remove_background_upload(
        &self,
        reader: impl Read,
        content_type: Option<&str>,
    ) -> Result<RemovalOutput, RejectionError> {
        check_content_type(content_type)?;
        let bytes = read_capped(
            reader,
            self.config.validation.max_bytes,
            self.config.background_removal.chunk_size,
        )?;
        self.remove_background(&bytes)
    }

    /// Analyze a file on disk, taking its content type from the extension.
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisRecord, RejectionError> {
        check_content_type(content_type_for_path(path))?;
        let bytes = self.read_file(path)?;
        self.analyze(&bytes)
    }

    /// Remove the background of a file on disk.
    pub fn remove_background_path(&self, path: &Path) -> Result<RemovalOutput, RejectionError> {
        let file = open(path)?;
        self.remove_background_upload(file, content_type_for_path(path))
    }

    /// Validate a file on disk and report its moderation verdict.
    pub fn moderate_path(&self, path: &Path) -> Result<ModerationVerdict, RejectionError> {
        check_content_type(content_type_for_path(path))?;
        let bytes = self.read_file(path)?;
        self.moderate(&bytes)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, RejectionError> {
        read_capped(
            open(path)?,
            self.config.validation.max_bytes,
            self.config.background_removal.chunk_size,
        )
    }

    pub fn health(&self) -> HealthReport {
        let mut features = vec!["analysis", "background_removal"];
        if self.config.moderation.enabled {
            features.push("content_moderation");
        }
        HealthReport {
            status: "healthy",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            classifier: self.extractor.classifier().describe(),
            removal_method: self.remover.method(),
            features,
        }
    }
}

fn open(path: &Path) -> Result<File, RejectionError> {
    File::open(path)
        .map_err(|e| RejectionError::invalid(format!("cannot open {}: {e}", path.display())))
}

/// Default output path for a background-removed image:
/// `processed_<stem>.png` next to the input.
pub fn processed_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("processed_{stem}.png"))
}
