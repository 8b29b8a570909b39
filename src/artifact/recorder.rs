//! Artifact recorder
//!
//! Symlink policy:
//! - symlinks to files are always recorded, keyed by the link path and
//!   hashed from the target content
//! - symlinks to directories are descended only with `follow_symlink_dirs`,
//!   otherwise skipped entirely
//! - while following, a link back into the current ancestor chain is an
//!   error rather than an endless walk

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use steplink_metadata::Artifacts;

use super::hasher::{digest_reader, HashAlgorithm, HashError};
use super::matcher::{ExcludeRules, StripRules};
use super::path::normalize;
use super::RecordError;

/// Settings shared by the material and product recording passes
#[derive(Debug, Clone)]
pub struct RecordOptions {
    algorithms: Vec<HashAlgorithm>,
    exclude: ExcludeRules,
    strip: StripRules,
    normalize_line_endings: bool,
    follow_symlink_dirs: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            algorithms: vec![HashAlgorithm::default()],
            exclude: ExcludeRules::default(),
            strip: StripRules::default(),
            normalize_line_endings: false,
            follow_symlink_dirs: false,
        }
    }
}

impl RecordOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digest algorithms (must not be empty)
    pub fn with_algorithms(mut self, algorithms: Vec<HashAlgorithm>) -> Result<Self, HashError> {
        if algorithms.is_empty() {
            return Err(HashError::NoAlgorithms);
        }
        self.algorithms = algorithms;
        Ok(self)
    }

    pub fn with_exclude(mut self, exclude: ExcludeRules) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_strip(mut self, strip: StripRules) -> Self {
        self.strip = strip;
        self
    }

    /// Rewrite CRLF/CR to LF before hashing
    pub fn with_normalize_line_endings(mut self, normalize: bool) -> Self {
        self.normalize_line_endings = normalize;
        self
    }

    /// Descend into symlinked directories
    pub fn with_follow_symlink_dirs(mut self, follow: bool) -> Self {
        self.follow_symlink_dirs = follow;
        self
    }

    pub fn algorithms(&self) -> &[HashAlgorithm] {
        &self.algorithms
    }

    pub fn exclude(&self) -> &ExcludeRules {
        &self.exclude
    }

    pub fn strip(&self) -> &StripRules {
        &self.strip
    }

    pub fn normalize_line_endings(&self) -> bool {
        self.normalize_line_endings
    }

    pub fn follow_symlink_dirs(&self) -> bool {
        self.follow_symlink_dirs
    }
}

/// Records one set of paths into an artifact map
pub struct Recorder<'a> {
    options: &'a RecordOptions,
    artifacts: Artifacts,
    /// artifact key → normalized path it was recorded from
    sources: BTreeMap<String, String>,
}

impl<'a> Recorder<'a> {
    pub fn new(options: &'a RecordOptions) -> Self {
        Self {
            options,
            artifacts: Artifacts::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Walk and hash every path, returning the finished map
    pub fn record<P: AsRef<Path>>(mut self, paths: &[P]) -> Result<Artifacts, RecordError> {
        for path in paths {
            self.record_path(path.as_ref())?;
        }
        Ok(self.artifacts)
    }

    fn record_path(&mut self, root: &Path) -> Result<(), RecordError> {
        let follow = self.options.follow_symlink_dirs;
        let mut walker = WalkDir::new(root)
            .follow_links(follow)
            .follow_root_links(follow)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(walk_error)?;
            let path = entry.path();
            let normalized = normalize(path);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if entry.depth() > 0 && self.options.exclude.is_excluded_dir(&normalized) {
                    debug!(path = %normalized, "excluded directory");
                    walker.skip_current_dir();
                }
                continue;
            }

            // Only reported when links are not followed.
            if file_type.is_symlink() {
                let target = fs::metadata(path).map_err(|e| io_error(&normalized, e))?;
                if target.is_dir() {
                    debug!(path = %normalized, "skipping symlinked directory");
                    continue;
                }
                if !target.is_file() {
                    continue;
                }
            } else if !file_type.is_file() {
                continue;
            }

            if self.options.exclude.is_excluded(&normalized) {
                debug!(path = %normalized, "excluded file");
                continue;
            }

            self.record_file(path, normalized)?;
        }

        Ok(())
    }

    fn record_file(&mut self, path: &Path, normalized: String) -> Result<(), RecordError> {
        let key = self.options.strip.apply(&normalized)?;

        if let Some(first) = self.sources.get(&key) {
            if *first == normalized {
                // Same file reached through overlapping inputs.
                return Ok(());
            }
            return Err(RecordError::DuplicateArtifactKey {
                key,
                first: first.clone(),
                second: normalized,
            });
        }

        let file = File::open(path).map_err(|e| io_error(&normalized, e))?;
        let digests = digest_reader(
            file,
            &self.options.algorithms,
            self.options.normalize_line_endings,
        )
        .map_err(|e| io_error(&normalized, e))?;

        debug!(path = %normalized, key = %key, "recorded artifact");
        self.artifacts.insert(key.clone(), digests);
        self.sources.insert(key, normalized);
        Ok(())
    }
}

/// Record `paths` with `options`
pub fn record_artifacts<P: AsRef<Path>>(
    paths: &[P],
    options: &RecordOptions,
) -> Result<Artifacts, RecordError> {
    let artifacts = Recorder::new(options).record(paths)?;
    info!(
        inputs = paths.len(),
        artifacts = artifacts.len(),
        "recorded artifacts"
    );
    Ok(artifacts)
}

fn io_error(path: &str, source: io::Error) -> RecordError {
    RecordError::Io {
        path: path.to_string(),
        source,
    }
}

fn walk_error(err: walkdir::Error) -> RecordError {
    let path = err.path().map(normalize).unwrap_or_default();
    if let Some(ancestor) = err.loop_ancestor() {
        return RecordError::SymlinkCycle {
            path,
            ancestor: normalize(ancestor),
        };
    }
    RecordError::Io {
        path,
        source: err.into(),
    }
}
