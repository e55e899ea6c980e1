// src/errors.rs

use thiserror::Error;

/// Recoverable failure while turning one identity's region into features.
/// Never escapes the identity/frame it happened in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("contour has {0} point(s), need at least 3")]
    TooFewPoints(usize),

    #[error("region mask produced no external contour")]
    NoContour,

    #[error("contour has zero area, centroid undefined")]
    ZeroArea,

    #[error("non-finite feature value: {0}")]
    NonFinite(&'static str),
}

/// Run-fatal failure categories. Wrapped in `anyhow::Error` with context when propagated.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not open video source {path}: {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("failed to read frame {frame}: {reason}")]
    SourceRead { frame: u64, reason: String },

    #[error("video sink failed on frame {frame}: {reason}")]
    Sink { frame: u64, reason: String },

    #[error("detector failed on frame {frame}: {reason}")]
    Detector { frame: u64, reason: String },

    #[error("progress publication failed on frame {frame}: {reason}")]
    Publish { frame: u64, reason: String },
}
