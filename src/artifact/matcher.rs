//! Exclusion patterns and left-strip prefixes
//!
//! Exclusion patterns follow a gitignore-like subset:
//! - `*` and `?` never match `/`, `**` matches across directories
//! - a leading `/` anchors the pattern to the start of the path, otherwise
//!   the pattern matches at any depth
//! - paths are matched as given, before left-strip; for absolute inputs an
//!   anchored pattern is therefore an absolute path (`/work/repo/vendor`)
//! - a trailing `/` restricts the pattern to directories
//! - a path is excluded when the path or any of its parent directories match
//!
//! There is no negation, so the order of patterns does not matter.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::RecordError;
use crate::config::ConfigError;

/// Compiled exclusion patterns
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    patterns: Vec<String>,
    any: GlobSet,
    dirs_only: GlobSet,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            any: GlobSet::empty(),
            dirs_only: GlobSet::empty(),
        }
    }
}

impl ExcludeRules {
    /// Compile a list of patterns. Empty patterns are ignored.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut any = GlobSetBuilder::new();
        let mut dirs_only = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref();
            if raw.is_empty() {
                continue;
            }

            let (body, dir_only) = match raw.strip_suffix('/') {
                Some(body) => (body, true),
                None => (raw, false),
            };
            let glob = match body.strip_prefix('/') {
                Some(anchored) => anchored.to_string(),
                None => format!("**/{}", body),
            };
            if glob.is_empty() || glob == "**/" {
                return Err(ConfigError::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: "pattern matches nothing".to_string(),
                });
            }

            let compiled = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: e.kind().to_string(),
                })?;

            if dir_only {
                dirs_only.add(compiled);
            } else {
                any.add(compiled);
            }
            kept.push(raw.to_string());
        }

        let build_err = |e: globset::Error| ConfigError::InvalidPattern {
            pattern: kept.join(", "),
            reason: e.to_string(),
        };
        let any = any.build().map_err(build_err)?;
        let dirs_only = dirs_only.build().map_err(build_err)?;

        Ok(Self {
            patterns: kept,
            any,
            dirs_only,
        })
    }

    /// Patterns as configured
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if a file path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.matches(path, false)
    }

    /// Check if a directory path should be excluded (and not descended into)
    pub fn is_excluded_dir(&self, path: &str) -> bool {
        self.matches(path, true)
    }

    fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.is_empty() {
            return false;
        }
        // Anchored globs are compiled without their leading slash.
        let path = path.strip_prefix('/').unwrap_or(path);

        // Every proper ancestor is a directory.
        for (i, _) in path.match_indices('/') {
            let ancestor = &path[..i];
            if ancestor.is_empty() {
                continue;
            }
            if self.any.is_match(ancestor) || self.dirs_only.is_match(ancestor) {
                return true;
            }
        }

        self.any.is_match(path) || (is_dir && self.dirs_only.is_match(path))
    }
}

/// Validated set of left-strip prefixes
///
/// No prefix is a prefix of another one, so at most one prefix can apply to
/// any given path.
#[derive(Debug, Clone, Default)]
pub struct StripRules {
    prefixes: Vec<String>,
}

impl StripRules {
    /// Validate a set of prefixes
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, ConfigError> {
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.as_ref().to_string()).collect();

        if prefixes.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::EmptyStripPrefix);
        }

        for (i, a) in prefixes.iter().enumerate() {
            for (j, b) in prefixes.iter().enumerate() {
                if i != j && b.starts_with(a.as_str()) {
                    return Err(ConfigError::ConflictingStripPrefixes {
                        prefix: a.clone(),
                        other: b.clone(),
                    });
                }
            }
        }

        Ok(Self { prefixes })
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Remove the matching prefix from `path`, if any
    pub fn apply(&self, path: &str) -> Result<String, RecordError> {
        let matching: Vec<&String> = self
            .prefixes
            .iter()
            .filter(|p| path.starts_with(p.as_str()))
            .collect();

        match matching.as_slice() {
            [] => Ok(path.to_string()),
            [prefix] => Ok(path[prefix.len()..].to_string()),
            _ => Err(RecordError::AmbiguousStrip {
                path: path.to_string(),
                prefixes: matching.into_iter().cloned().collect(),
            }),
        }
    }
}
