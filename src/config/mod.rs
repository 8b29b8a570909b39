//! Step configuration
//!
//! Two layers, lowest precedence first:
//! 1. Settings file (`.steplink.toml` or `--config`)
//! 2. CLI flags
//!
//! Lists are replaced, not appended, and scalars override. The merged
//! settings are validated once into an immutable [`StepConfig`] that is
//! passed by reference through the whole run.

mod settings;
mod step;

pub use settings::{Settings, DEFAULT_SETTINGS_FILE};
pub use step::{validate_step_name, StepConfig, StepConfigBuilder};

use thiserror::Error;

use crate::artifact::HashError;

/// Errors from building a step configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid exclude pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("strip prefix must not be empty")]
    EmptyStripPrefix,

    #[error("strip prefix {prefix:?} is a prefix of {other:?}")]
    ConflictingStripPrefixes { prefix: String, other: String },

    #[error("hash algorithm error: {0}")]
    Hash(#[from] HashError),

    #[error("invalid step name: {0}")]
    InvalidStepName(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
