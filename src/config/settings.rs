//! Recording settings file (`.steplink.toml`)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;
use crate::artifact::{ExcludeRules, HashAlgorithm, RecordOptions, StripRules};

/// Settings file looked up in the working directory when `--config` is absent
pub const DEFAULT_SETTINGS_FILE: &str = ".steplink.toml";

/// One configuration layer. `None` means "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Exclusion patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Left-strip prefixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lstrip_paths: Option<Vec<String>>,

    /// Digest algorithm names (default: sha256)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_algorithms: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize_line_endings: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_symlink_dirs: Option<bool>,

    /// Directory the link file is written to (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_directory: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// Load `path` if given, else the default file in `dir` if it exists
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = dir.join(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Layer `overlay` on top of `self`; every field set in `overlay` wins
    pub fn overlay(self, overlay: Settings) -> Settings {
        Settings {
            exclude: overlay.exclude.or(self.exclude),
            lstrip_paths: overlay.lstrip_paths.or(self.lstrip_paths),
            hash_algorithms: overlay.hash_algorithms.or(self.hash_algorithms),
            normalize_line_endings: overlay.normalize_line_endings.or(self.normalize_line_endings),
            follow_symlink_dirs: overlay.follow_symlink_dirs.or(self.follow_symlink_dirs),
            metadata_directory: overlay.metadata_directory.or(self.metadata_directory),
        }
    }

    /// Validate into recorder options
    pub fn record_options(&self) -> Result<RecordOptions, ConfigError> {
        let algorithms = match &self.hash_algorithms {
            Some(names) => HashAlgorithm::parse_list(names.as_slice())?,
            None => vec![HashAlgorithm::default()],
        };
        let exclude = match &self.exclude {
            Some(patterns) => ExcludeRules::new(patterns.as_slice())?,
            None => ExcludeRules::default(),
        };
        let strip = match &self.lstrip_paths {
            Some(prefixes) => StripRules::new(prefixes.as_slice())?,
            None => StripRules::default(),
        };

        Ok(RecordOptions::new()
            .with_algorithms(algorithms)?
            .with_exclude(exclude)
            .with_strip(strip)
            .with_normalize_line_endings(self.normalize_line_endings.unwrap_or(false))
            .with_follow_symlink_dirs(self.follow_symlink_dirs.unwrap_or(false)))
    }

    pub fn metadata_directory(&self) -> PathBuf {
        self.metadata_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
