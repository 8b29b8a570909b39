//! Validated, immutable configuration for one step run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::ConfigError;
use crate::artifact::RecordOptions;

/// Check that `name` can name a step and its link file.
///
/// Checked when a [`StepConfig`] is built, before anything is recorded.
pub fn validate_step_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::InvalidStepName(
            "step name must not be empty".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ConfigError::InvalidStepName(format!(
            "{:?} cannot be used in a file name",
            name
        )));
    }
    Ok(())
}

/// Everything a step run needs, checked up front
#[derive(Debug, Clone)]
pub struct StepConfig {
    name: String,
    run_dir: Option<PathBuf>,
    material_paths: Vec<PathBuf>,
    product_paths: Vec<PathBuf>,
    record: RecordOptions,
    command: Vec<String>,
    environment: BTreeMap<String, String>,
    metadata_dir: PathBuf,
}

impl StepConfig {
    /// Start building a configuration for the named step
    pub fn builder(name: impl Into<String>) -> StepConfigBuilder {
        StepConfigBuilder {
            name: name.into(),
            run_dir: None,
            material_paths: Vec::new(),
            product_paths: Vec::new(),
            record: RecordOptions::default(),
            command: Vec::new(),
            environment: BTreeMap::new(),
            metadata_dir: PathBuf::from("."),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Working directory for the command (None = current directory)
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    pub fn material_paths(&self) -> &[PathBuf] {
        &self.material_paths
    }

    pub fn product_paths(&self) -> &[PathBuf] {
        &self.product_paths
    }

    pub fn record_options(&self) -> &RecordOptions {
        &self.record
    }

    /// Command tokens; empty means the step runs no command
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }
}

/// Builder for [`StepConfig`]
#[derive(Debug, Clone)]
pub struct StepConfigBuilder {
    name: String,
    run_dir: Option<PathBuf>,
    material_paths: Vec<PathBuf>,
    product_paths: Vec<PathBuf>,
    record: RecordOptions,
    command: Vec<String>,
    environment: BTreeMap<String, String>,
    metadata_dir: PathBuf,
}

impl StepConfigBuilder {
    pub fn run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(dir.into());
        self
    }

    pub fn materials<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.material_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn products<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.product_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn record_options(mut self, options: RecordOptions) -> Self {
        self.record = options;
        self
    }

    pub fn command<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = dir.into();
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<StepConfig, ConfigError> {
        validate_step_name(&self.name)?;

        Ok(StepConfig {
            name: self.name,
            run_dir: self.run_dir,
            material_paths: self.material_paths,
            product_paths: self.product_paths,
            record: self.record,
            command: self.command,
            environment: self.environment,
            metadata_dir: self.metadata_dir,
        })
    }
}
