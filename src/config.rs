//! Service configuration module.
//!
//! Handles loading, validating, and merging a `config.toml` file. Stock
//! defaults (the catalog vocabularies and thresholds below) are overridden by
//! whatever the user file specifies. The core treats the result as a
//! read-only, process-wide configuration object.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [catalog]
//! clothing_types = ["haut", "bas", "chaussure", "accessoire", "autre"]
//! styles = ["Casual", "Chic", "Streetwear", ...]
//! colors = ["noir", "blanc", "gris", ...]
//! materials = ["Coton", "Lin", ...]
//! patterns = ["Uni", "Rayé", ...]
//!
//! [catalog.sizes]
//! haut = ["XS", "S", "M", "L", "XL", "XXL"]
//! accessoire = ["unique"]
//!
//! [model]
//! embedding_dimensions = 128  # Length of the returned embedding
//! min_styles = 1              # Fewest styles per record
//! max_styles = 3              # Most styles per record
//! input_size = 224            # Square side the classifier sees
//! num_classes = 1000          # Classifier output width
//! weights_seed = 2024         # Seed of the built-in projection weights
//!
//! [moderation]
//! enabled = true
//! nsfw_threshold = 0.6        # Skin ratio above which an image is unsafe
//! block_nsfw = true           # Reject unsafe images instead of flagging them
//!
//! [validation]
//! min_dimension = 50          # Minimum width and height in pixels
//! max_bytes = 10485760        # 10 MiB
//!
//! [background_removal]
//! white_threshold = 240       # Fallback: pixels above this on all channels go transparent
//! chunk_size = 1048576        # Read chunk size for streamed uploads
//!
//! [processing]
//! max_workers = 4             # Parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Closed vocabularies for every categorical attribute.
    pub catalog: CatalogConfig,
    /// Classifier and attribute-selection settings.
    pub model: ModelConfig,
    /// Moderation heuristic thresholds and policy.
    pub moderation: ModerationConfig,
    /// Structural limits enforced by the validation gate.
    pub validation: ValidationConfig,
    /// Background removal settings.
    pub background_removal: RemovalConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let catalog = &self.catalog;
        for (name, values) in [
            ("catalog.clothing_types", &catalog.clothing_types),
            ("catalog.styles", &catalog.styles),
            ("catalog.colors", &catalog.colors),
            ("catalog.materials", &catalog.materials),
            ("catalog.patterns", &catalog.patterns),
        ] {
            if values.is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        if let Some((kind, _)) = catalog.sizes.iter().find(|(_, sizes)| sizes.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "catalog.sizes.{kind} must not be empty"
            )));
        }

        let model = &self.model;
        if model.embedding_dimensions == 0 {
            return Err(ConfigError::Validation(
                "model.embedding_dimensions must be non-zero".into(),
            ));
        }
        if model.min_styles == 0 || model.min_styles > model.max_styles {
            return Err(ConfigError::Validation(
                "model.min_styles must be >= 1 and <= model.max_styles".into(),
            ));
        }
        if model.max_styles > catalog.styles.len() {
            return Err(ConfigError::Validation(format!(
                "model.max_styles ({}) exceeds the {} configured styles",
                model.max_styles,
                catalog.styles.len()
            )));
        }
        if model.input_size == 0 || model.num_classes == 0 {
            return Err(ConfigError::Validation(
                "model.input_size and model.num_classes must be non-zero".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.moderation.nsfw_threshold) {
            return Err(ConfigError::Validation(
                "moderation.nsfw_threshold must be between 0 and 1".into(),
            ));
        }
        if self.validation.min_dimension == 0 || self.validation.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "validation.min_dimension and validation.max_bytes must be non-zero".into(),
            ));
        }
        if self.background_removal.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "background_removal.chunk_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Closed, ordered vocabularies for categorical attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub clothing_types: Vec<String>,
    pub styles: Vec<String>,
    pub colors: Vec<String>,
    pub materials: Vec<String>,
    pub patterns: Vec<String>,
    /// Allowed sizes keyed by clothing type.
    pub sizes: BTreeMap<String, Vec<String>>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let sizes = [
            ("haut", &["XS", "S", "M", "L", "XL", "XXL"][..]),
            ("bas", &["34", "36", "38", "40", "42", "44", "46"][..]),
            (
                "chaussure",
                &["35", "36", "37", "38", "39", "40", "41", "42", "43", "44", "45"][..],
            ),
            ("accessoire", &["unique"][..]),
            ("autre", &["unique", "S", "M", "L"][..]),
        ]
        .into_iter()
        .map(|(kind, sizes)| (kind.to_string(), strings(sizes)))
        .collect();

        Self {
            clothing_types: strings(&["haut", "bas", "chaussure", "accessoire", "autre"]),
            styles: strings(&[
                "Casual",
                "Chic",
                "Streetwear",
                "Sportif",
                "Vintage",
                "Bohème",
                "Minimaliste",
                "Rock",
            ]),
            colors: strings(&[
                "noir",
                "blanc",
                "gris",
                "beige",
                "bleu",
                "marron",
                "kaki",
                "rouge",
                "vert",
                "jaune",
                "rose",
                "multicolore",
                "camel",
                "doré",
            ]),
            materials: strings(&[
                "Coton",
                "Lin",
                "Polyester",
                "Laine",
                "Cuir",
                "Denim",
                "Soie",
                "Synthétique",
                "Velours",
                "Satin",
                "Jean",
                "Jersey",
            ]),
            patterns: strings(&[
                "Uni",
                "Rayé",
                "À carreaux",
                "Fleuri",
                "Graphique",
                "Imprimé",
                "Pois",
                "Animal",
                "Géométrique",
            ]),
            sizes,
        }
    }
}

/// Sizes used when a clothing type has no entry in `catalog.sizes`.
pub const FALLBACK_SIZES: &[&str] = &["M"];

impl CatalogConfig {
    /// Sizes allowed for `clothing_type`, or `None` when the map has no entry.
    pub fn sizes_for(&self, clothing_type: &str) -> Option<&[String]> {
        self.sizes.get(clothing_type).map(Vec::as_slice)
    }
}

/// Classifier and attribute-selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Exact length of the embedding returned by analysis.
    pub embedding_dimensions: usize,
    pub min_styles: usize,
    pub max_styles: usize,
    /// Square side (pixels) images are resized to before classification.
    pub input_size: u32,
    /// Width of the classifier's output vector.
    pub num_classes: usize,
    /// Seed the built-in classifier derives its weights from.
    pub weights_seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dimensions: 128,
            min_styles: 1,
            max_styles: 3,
            input_size: 224,
            num_classes: 1000,
            weights_seed: 2024,
        }
    }
}

/// Moderation heuristic thresholds and policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModerationConfig {
    pub enabled: bool,
    /// Skin ratio above which an image is flagged outright.
    pub nsfw_threshold: f64,
    /// Turn unsafe verdicts into `ContentBlocked` rejections.
    pub block_nsfw: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nsfw_threshold: 0.6,
            block_nsfw: true,
        }
    }
}

/// Structural limits enforced by the validation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Minimum width and height in pixels.
    pub min_dimension: u32,
    /// Maximum encoded size in bytes.
    pub max_bytes: usize,
}

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_dimension: 50,
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// Background removal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalConfig {
    /// Fallback strategy: a pixel whose R, G and B all exceed this goes transparent.
    pub white_threshold: u8,
    /// Chunk size for reading streamed uploads.
    pub chunk_size: usize,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            white_threshold: 240,
            chunk_size: 1024 * 1024,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel pipeline workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never less than one
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServiceConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a
///   vocabulary list in a user file replaces the stock list.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config.
///
/// With no path, or a path that does not exist, the stock defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => load_raw_config(path)?,
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Clothing Service Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Lists replace the stock list entirely; tables merge key by key.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Catalog vocabularies
# ---------------------------------------------------------------------------
[catalog]
# Clothing types. The classifier's class index is mapped onto this list.
clothing_types = ["haut", "bas", "chaussure", "accessoire", "autre"]

# Styles. Each record carries between model.min_styles and model.max_styles
# distinct entries from this list.
styles = ["Casual", "Chic", "Streetwear", "Sportif", "Vintage", "Bohème", "Minimaliste", "Rock"]

colors = ["noir", "blanc", "gris", "beige", "bleu", "marron", "kaki", "rouge", "vert", "jaune", "rose", "multicolore", "camel", "doré"]

materials = ["Coton", "Lin", "Polyester", "Laine", "Cuir", "Denim", "Soie", "Synthétique", "Velours", "Satin", "Jean", "Jersey"]

patterns = ["Uni", "Rayé", "À carreaux", "Fleuri", "Graphique", "Imprimé", "Pois", "Animal", "Géométrique"]

# Sizes per clothing type. Types without an entry fall back to ["M"].
[catalog.sizes]
haut = ["XS", "S", "M", "L", "XL", "XXL"]
bas = ["34", "36", "38", "40", "42", "44", "46"]
chaussure = ["35", "36", "37", "38", "39", "40", "41", "42", "43", "44", "45"]
accessoire = ["unique"]
autre = ["unique", "S", "M", "L"]

# ---------------------------------------------------------------------------
# Model
# ---------------------------------------------------------------------------
[model]
# Length of the embedding vector returned for similarity search.
embedding_dimensions = 128

# Number of styles attached to each record (inclusive bounds).
min_styles = 1
max_styles = 3

# Images are resized to input_size x input_size before classification.
input_size = 224

# Width of the classifier output.
num_classes = 1000

# Seed the built-in classifier derives its projection weights from.
weights_seed = 2024

# ---------------------------------------------------------------------------
# Content moderation
# ---------------------------------------------------------------------------
[moderation]
enabled = true

# Skin ratio (0-1) above which an image is considered unsafe.
nsfw_threshold = 0.6

# Reject unsafe images (status 451) instead of only flagging them.
block_nsfw = true

# ---------------------------------------------------------------------------
# Validation
# ---------------------------------------------------------------------------
[validation]
# Minimum width and height in pixels.
min_dimension = 50

# Maximum upload size in bytes (10 MiB).
max_bytes = 10485760

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background_removal]
# Fallback strategy: pixels brighter than this on R, G and B become transparent.
white_threshold = 240

# Uploads are read in chunks of this many bytes; the size cap is checked per chunk.
chunk_size = 1048576

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch analysis.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_catalog_matches_store_schema() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.catalog.clothing_types,
            vec!["haut", "bas", "chaussure", "accessoire", "autre"]
        );
        assert_eq!(config.catalog.styles.len(), 8);
        assert_eq!(config.catalog.colors.len(), 14);
        assert_eq!(config.catalog.materials.len(), 12);
        assert_eq!(config.catalog.patterns.len(), 9);
    }

    #[test]
    fn every_default_type_has_sizes() {
        let config = ServiceConfig::default();
        for kind in &config.catalog.clothing_types {
            assert!(config.catalog.sizes_for(kind).is_some(), "{kind} has no sizes");
        }
        assert_eq!(config.catalog.sizes_for("robe"), None);
    }

    #[test]
    fn default_model_and_moderation_settings() {
        let config = ServiceConfig::default();
        assert_eq!(config.model.embedding_dimensions, 128);
        assert_eq!((config.model.min_styles, config.model.max_styles), (1, 3));
        assert!(config.moderation.enabled);
        assert_eq!(config.moderation.nsfw_threshold, 0.6);
        assert!(config.moderation.block_nsfw);
        assert_eq!(config.validation.min_dimension, 50);
        assert_eq!(config.validation.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.background_removal.white_threshold, 240);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[moderation]
nsfw_threshold = 0.5
"#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.moderation.nsfw_threshold, 0.5);
        assert!(config.moderation.block_nsfw);
        assert_eq!(config.model.embedding_dimensions, 128);
    }

    #[test]
    fn effective_workers_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_workers_clamped() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_workers: Some(99_999),
        };
        assert_eq!(effective_workers(&config), cores);
        let config = ProcessingConfig {
            max_workers: Some(0),
        };
        assert_eq!(effective_workers(&config), 1);
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_lists_replace() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value =
            toml::from_str("[catalog]\nstyles = [\"A\", \"B\", \"C\"]").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.catalog.styles, vec!["A", "B", "C"]);
        assert_eq!(config.catalog.colors.len(), 14);
    }

    #[test]
    fn merge_toml_size_map_merges_by_key() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value =
            toml::from_str("[catalog.sizes]\nrobe = [\"36\", \"38\"]").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.catalog.sizes.len(), 6);
        assert_eq!(config.catalog.sizes_for("robe").unwrap().len(), 2);
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str("[moderation]\nthreshold = 0.5");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str("[server]\nport = 8000");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_threshold_out_of_range() {
        let mut config = ServiceConfig::default();
        config.moderation.nsfw_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_style_bounds() {
        let mut config = ServiceConfig::default();
        config.model.min_styles = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.model.min_styles = 4;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.model.max_styles = 9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the 8 configured styles"));
    }

    #[test]
    fn validate_empty_vocabulary() {
        let mut config = ServiceConfig::default();
        config.catalog.patterns.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("catalog.patterns"));
    }

    #[test]
    fn validate_empty_size_list() {
        let mut config = ServiceConfig::default();
        config.catalog.sizes.insert("robe".into(), Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_embedding() {
        let mut config = ServiceConfig::default();
        config.model.embedding_dimensions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_without_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), ServiceConfig::default());
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("config.toml"))).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn load_config_applies_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[moderation]\nblock_nsfw = false\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(!config.moderation.block_nsfw);
        assert!(config.moderation.enabled);
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[model]\nembedding_dimensions = 0\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn load_config_reports_bad_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[moderation\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)).unwrap_err(),
            ConfigError::Toml(_)
        ));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ServiceConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        let table = value.as_table().unwrap();
        for section in [
            "catalog",
            "model",
            "moderation",
            "validation",
            "background_removal",
            "processing",
        ] {
            assert!(table.contains_key(section), "missing [{section}]");
        }
    }
}
