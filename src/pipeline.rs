//! Step pipeline
//!
//! Runs one step strictly in order:
//! - record materials
//! - run the command (skipped when the step has none)
//! - record products
//! - assemble the link and sign it
//!
//! Products must reflect the filesystem after the command, so nothing here
//! overlaps. Any error aborts the run before an envelope is written.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use steplink_metadata::{ByProducts, Link, LinkError, Metablock};

use crate::artifact::{record_artifacts, RecordError};
use crate::config::{ConfigError, StepConfig};
use crate::runner::{CommandRunner, RunnerError};
use crate::signing::{sign_link, write_envelope, Key, KeyError, SigningError};

/// Recording pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Materials,
    Products,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Materials => f.write_str("materials"),
            Self::Products => f.write_str("products"),
        }
    }
}

/// Step errors
#[derive(Debug, Error)]
pub enum StepError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("failed to record {phase}: {source}")]
    Record { phase: Phase, source: RecordError },

    #[error("command error: {0}")]
    Command(#[from] RunnerError),

    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),
}

impl StepError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            StepError::Config(_) => 2,
            StepError::Key(_) => 3,
            StepError::Record { .. } => 4,
            StepError::Command(_) => 5,
            StepError::Link(_) => 2,
            StepError::Signing(_) => 6,
        }
    }
}

/// Result type for step operations
pub type StepResult<T> = Result<T, StepError>;

/// Run a step and return its envelope (signed when `key` is present)
pub fn run_step<R>(config: &StepConfig, key: &Key, runner: &R) -> StepResult<Metablock>
where
    R: CommandRunner + ?Sized,
{
    let options = config.record_options();

    info!(step = config.name(), "recording materials");
    let materials = record_artifacts(config.material_paths(), options).map_err(|source| {
        StepError::Record {
            phase: Phase::Materials,
            source,
        }
    })?;

    let byproducts = if config.command().is_empty() {
        info!(step = config.name(), "no command to run");
        ByProducts::empty()
    } else {
        info!(step = config.name(), command = ?config.command(), "running command");
        runner.run(config.command(), config.run_dir())?
    };

    info!(step = config.name(), "recording products");
    let products = record_artifacts(config.product_paths(), options).map_err(|source| {
        StepError::Record {
            phase: Phase::Products,
            source,
        }
    })?;

    let link = Link::assemble(
        config.name(),
        materials,
        products,
        byproducts,
        config.command().to_vec(),
        config.environment().clone(),
    )?;

    Ok(sign_link(link, key)?)
}

/// Run a step and write its envelope to the configured metadata directory
pub fn run_and_write<R>(
    config: &StepConfig,
    key: &Key,
    runner: &R,
) -> StepResult<(Metablock, PathBuf)>
where
    R: CommandRunner + ?Sized,
{
    let envelope = run_step(config, key, runner)?;
    let path = write_envelope(&envelope, config.metadata_dir())?;
    Ok((envelope, path))
}
