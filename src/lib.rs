//! # Clothing Service
//!
//! Image processing core for a clothing catalog: validates uploaded photos,
//! screens them with a content-moderation heuristic, derives a catalog
//! record (attributes plus an embedding) and strips backgrounds.
//!
//! # Architecture: Two Pipelines
//!
//! Every request is one synchronous pipeline invocation over its own bytes:
//!
//! ```text
//! Analyze            bytes → validate → moderate → extract  → AnalysisRecord
//! RemoveBackground   bytes → validate → remove   → PNG      → RemovalOutput
//! ```
//!
//! Each stage either hands a fully valid value to the next or stops the
//! pipeline with a [`RejectionError`](rejection::RejectionError). The only
//! long-lived state is the configuration and the loaded models, both shared
//! read-only, so one [`ClothingService`](service::ClothingService) can serve
//! any number of concurrent callers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`service`] | Composition root: wires config and models into the two pipelines |
//! | [`validation`] | Validation gate: decodable, supported format, size and dimension limits |
//! | [`moderation`] | Skin-ratio and brightness heuristic, block/flag policy |
//! | [`analysis`] | Attribute and embedding extraction on top of a [`Classifier`](inference::Classifier) |
//! | [`removal`] | Background removal: segmentation model or near-white fallback |
//! | [`inference`] | Model seams (`Classifier`, `Segmenter`) and the built-in projection classifier |
//! | [`imaging`] | Decode/encode plus pure pixel math |
//! | [`intake`] | Content-type check and size-capped chunked reads |
//! | [`rejection`] | Error taxonomy and caller-facing error bodies |
//! | [`config`] | `config.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Deterministic Attributes
//!
//! Categorical attributes are drawn from closed vocabularies with an RNG
//! seeded by the classifier's class index. The same image always produces the
//! same record, which keeps catalog entries stable across re-uploads and makes
//! every pipeline test reproducible.
//!
//! ## Moderation Returns a Value
//!
//! [`ModerationEngine::screen`](moderation::ModerationEngine::screen) returns
//! a [`ModerationOutcome`](moderation::ModerationOutcome) rather than failing.
//! The service turns `Blocked` into a 451 rejection; the engine itself stays
//! a pure function of pixels and thresholds.
//!
//! ## Strategy Chosen Once
//!
//! Whether background removal uses a segmentation model or the near-white
//! fallback is decided when the service is built, never per request, and
//! every result records which one ran.

pub mod analysis;
pub mod config;
pub mod imaging;
pub mod inference;
pub mod intake;
pub mod moderation;
pub mod output;
pub mod rejection;
pub mod removal;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;
