//! CLI output formatting for every command.
//!
//! Each record is shown under a header line (the input file) with indented
//! `Key: value` context lines:
//!
//! ## Analyze
//!
//! ```text
//! 001 shirt.jpg
//!     Type: haut
//!     Name: Coton noir
//!     Color: noir
//!     Size: M
//!     Material: Coton
//!     Pattern: Uni
//!     Styles: Casual, Chic
//!     Confidence: 0.031
//!     Embedding: 128 dims
//!     Moderation: safe
//! ```
//!
//! ## Remove background
//!
//! ```text
//! shirt.jpg → processed_shirt.png
//!     Size: 800x600 → 800x600
//!     Mode: RGB → RGBA
//!     Method: fallback
//! ```
//!
//! ## Rejections
//!
//! ```text
//! 002 selfie.jpg
//!     Error: content_blocked (451)
//!     Message: Image rejected: inappropriate content detected
//!     Reason: high skin ratio
//!     Confidence: 0.812
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::moderation::ModerationVerdict;
use crate::rejection::{Operation, RejectionError};
use crate::removal::RemovalMetadata;
use crate::service::{AnalysisRecord, HealthReport, ModerationSummary};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn field(key: &str, value: impl std::fmt::Display) -> String {
    format!("{}{}: {}", indent(1), key, value)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn moderation_label(summary: ModerationSummary) -> &'static str {
    match (summary.checked, summary.is_safe) {
        (false, _) => "not checked",
        (true, true) => "safe",
        (true, false) => "flagged",
    }
}

// ============================================================================
// Analyze
// ============================================================================

pub fn format_analysis(index: usize, path: &Path, record: &AnalysisRecord) -> Vec<String> {
    let attrs = &record.attributes;
    vec![
        indexed_header(index, path),
        field("Type", &attrs.clothing_type),
        field("Name", &attrs.name),
        field("Color", &attrs.color),
        field("Size", &attrs.size),
        field("Material", &attrs.material),
        field("Pattern", &attrs.pattern),
        field("Styles", attrs.styles.join(", ")),
        field("Confidence", format!("{:.3}", attrs.confidence)),
        field("Embedding", format!("{} dims", attrs.embedding.len())),
        field("Moderation", moderation_label(record.moderation)),
    ]
}

pub fn print_analysis(index: usize, path: &Path, record: &AnalysisRecord) {
    for line in format_analysis(index, path, record) {
        println!("{}", line);
    }
}

// ============================================================================
// Moderate
// ============================================================================

pub fn format_verdict(path: &Path, verdict: &ModerationVerdict) -> Vec<String> {
    let mut lines = vec![
        file_name(path),
        field("Safe", if verdict.is_safe { "yes" } else { "no" }),
        field("Skin ratio", format!("{:.3}", verdict.skin_ratio)),
        field("Brightness", format!("{:.1}", verdict.brightness)),
    ];
    if !verdict.is_safe {
        lines.push(field("Reason", verdict.joined_reasons()));
        lines.push(field("Confidence", format!("{:.3}", verdict.confidence)));
    }
    lines
}

pub fn print_verdict(path: &Path, verdict: &ModerationVerdict) {
    for line in format_verdict(path, verdict) {
        println!("{}", line);
    }
}

// ============================================================================
// Remove background
// ============================================================================

pub fn format_removal(input: &Path, output: &Path, metadata: &RemovalMetadata) -> Vec<String> {
    vec![
        format!("{} → {}", file_name(input), output.display()),
        field(
            "Size",
            format!("{} → {}", metadata.original_size, metadata.processed_size),
        ),
        field(
            "Mode",
            format!(
                "{} → {}",
                metadata.original_mode.name(),
                metadata.processed_mode.name()
            ),
        ),
        field("Method", metadata.method.name()),
    ]
}

pub fn print_removal(input: &Path, output: &Path, metadata: &RemovalMetadata) {
    for line in format_removal(input, output, metadata) {
        println!("{}", line);
    }
}

// ============================================================================
// Rejections
// ============================================================================

/// Header plus the caller-facing error body, one field per line.
pub fn format_rejection(
    header: &str,
    err: &RejectionError,
    operation: Operation,
) -> Vec<String> {
    let body = err.body(operation);
    let mut lines = vec![
        header.to_string(),
        field("Error", format!("{} ({})", body.error, err.status_code())),
        field("Message", &body.message),
    ];
    if let Some(reason) = &body.reason {
        lines.push(field("Reason", reason));
    }
    if let Some(confidence) = body.confidence {
        lines.push(field("Confidence", format!("{:.3}", confidence)));
    }
    if let Some(help) = body.help {
        lines.push(field("Help", help));
    }
    lines
}

/// Rejections go to stderr so stdout stays parseable.
pub fn print_rejection(header: &str, err: &RejectionError, operation: Operation) {
    for line in format_rejection(header, err, operation) {
        eprintln!("{}", line);
    }
}

/// Header for the `index`-th input of a batch.
pub fn indexed_header(index: usize, path: &Path) -> String {
    format!("{} {}", format_index(index), file_name(path))
}

// ============================================================================
// Health
// ============================================================================

pub fn format_health(report: &HealthReport) -> Vec<String> {
    vec![
        format!("{} {} ({})", report.service, report.version, report.status),
        field("Classifier", &report.classifier),
        field("Background removal", report.removal_method.name()),
        field("Features", report.features.join(", ")),
    ]
}

pub fn print_health(report: &HealthReport) {
    for line in format_health(report) {
        println!("{}", line);
    }
}
