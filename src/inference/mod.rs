//! Model capabilities behind trait seams.
//!
//! The pipelines only talk to [`Classifier`] and [`Segmenter`]. Both are
//! constructed once at startup, wrapped in an `Arc`, and injected into the
//! processors, so tests can substitute fakes and concurrent requests share
//! one read-only model.
//!
//! | Capability | Built-in implementation |
//! |---|---|
//! | [`Classifier`] | [`ProjectionClassifier`] |
//! | [`Segmenter`] | none; background removal falls back to the near-white rule |

pub mod classifier;
pub mod projection;
pub mod segmenter;

pub use classifier::{Classifier, ClassifierOutput};
pub use projection::ProjectionClassifier;
pub use segmenter::{SegmentationError, Segmenter};
