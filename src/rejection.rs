//! Typed rejections shared by every stage.
//!
//! Every stage either returns a fully valid result or one of three
//! [`RejectionError`] variants. The calling layer maps each kind to a distinct
//! status code and a JSON body:
//!
//! | Kind | Status | `error` code |
//! |---|---|---|
//! | [`InvalidImage`](RejectionError::InvalidImage) | 400 | `invalid_image` |
//! | [`ContentBlocked`](RejectionError::ContentBlocked) | 451 | `content_blocked` |
//! | [`ProcessingFailed`](RejectionError::ProcessingFailed) | 500 | `analysis_failed` / `background_removal_failed` |

use serde::Serialize;
use thiserror::Error;

const BLOCKED_HELP: &str = "Please upload an appropriate clothing photo. Images containing nudity or other inappropriate content are not accepted.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectionError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("{message} ({reason})")]
    ContentBlocked {
        message: String,
        reason: String,
        confidence: f64,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Discriminant of a [`RejectionError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    InvalidImage,
    ContentBlocked,
    ProcessingFailed,
}

/// Which operation a rejection came from; only affects the 500 error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    RemoveBackground,
}

/// Serializable error payload handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
}

impl RejectionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RejectionError::InvalidImage(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        RejectionError::ProcessingFailed(message.into())
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            RejectionError::InvalidImage(_) => RejectionKind::InvalidImage,
            RejectionError::ContentBlocked { .. } => RejectionKind::ContentBlocked,
            RejectionError::ProcessingFailed(_) => RejectionKind::ProcessingFailed,
        }
    }

    /// HTTP-style status for the calling layer.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            RejectionKind::InvalidImage => 400,
            RejectionKind::ContentBlocked => 451,
            RejectionKind::ProcessingFailed => 500,
        }
    }

    /// Build the caller-facing body. Moderation rejections always carry the
    /// triggering reason and confidence.
    pub fn body(&self, operation: Operation) -> ErrorBody {
        match self {
            RejectionError::InvalidImage(message) => ErrorBody {
                error: "invalid_image",
                message: message.clone(),
                reason: None,
                confidence: None,
                help: None,
            },
            RejectionError::ContentBlocked {
                message,
                reason,
                confidence,
            } => ErrorBody {
                error: "content_blocked",
                message: message.clone(),
                reason: Some(reason.clone()),
                confidence: Some(*confidence),
                help: Some(BLOCKED_HELP),
            },
            RejectionError::ProcessingFailed(message) => ErrorBody {
                error: match operation {
                    Operation::Analyze => "analysis_failed",
                    Operation::RemoveBackground => "background_removal_failed",
                },
                message: message.clone(),
                reason: None,
                confidence: None,
                help: None,
            },
        }
    }
}
