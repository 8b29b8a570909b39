//! Error types for metadata construction and encoding.

use thiserror::Error;

/// Errors from the canonical encoder.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Canonical form only admits integers; floats have no unique rendering.
    #[error("non-integer number {0} has no canonical encoding")]
    NonIntegerNumber(String),

    #[error("input is valid JSON but not in canonical form")]
    NotCanonical,
}

/// Errors from assembling a link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid step name: {0}")]
    InvalidStepName(String),
}
