//! Shared helpers for integration tests
//!
//! Scratch trees live in a `TempDir`; recorded paths are made relative by
//! stripping the temp dir prefix.

#![allow(dead_code)]

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use steplink::artifact::path::normalize;
use steplink::{KeyPair, RecordOptions, StripRules};

/// Create `rel` under `root` with `contents`, making parent directories
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A small source tree: `src/a.go`, `src/gen/b.go`, `README`
pub fn source_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/a.go", b"package a\n");
    write_file(dir.path(), "src/gen/b.go", b"package gen\n");
    write_file(dir.path(), "README", b"hello\n");
    dir
}

/// Strip rule that turns paths under `root` into relative keys
pub fn strip_root(root: &Path) -> StripRules {
    StripRules::new(&[format!("{}/", normalize(root))]).unwrap()
}

/// Default recording options relative to `root`
pub fn options_for(root: &Path) -> RecordOptions {
    RecordOptions::default().with_strip(strip_root(root))
}

/// Fixed signing key so signatures are reproducible
pub fn test_key(seed: u8) -> KeyPair {
    KeyPair::from_seed(&[seed; 32]).unwrap()
}

/// Compute SHA256 hex digest
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
