//! Artifact recording
//!
//! Walks material and product paths, filters them through the exclusion and
//! left-strip rules and hashes every retained file.

mod hasher;
mod matcher;
pub mod path;
mod recorder;

pub use hasher::{digest_bytes, digest_reader, sha256_hex, HashAlgorithm, HashError};
pub use matcher::{ExcludeRules, StripRules};
pub use recorder::{record_artifacts, RecordOptions, Recorder};

use std::io;
use thiserror::Error;

/// Errors from recording artifacts
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: io::Error,
    },

    #[error("symlink cycle at {path}: links back to ancestor {ancestor}")]
    SymlinkCycle { path: String, ancestor: String },

    #[error("artifact key {key} is produced by both {first} and {second}")]
    DuplicateArtifactKey {
        key: String,
        first: String,
        second: String,
    },

    #[error("path {path} matches more than one strip prefix: {}", .prefixes.join(", "))]
    AmbiguousStrip { path: String, prefixes: Vec<String> },
}
