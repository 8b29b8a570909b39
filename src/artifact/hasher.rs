//! Multi-algorithm content hashing
//!
//! Files are streamed through a fixed buffer into every requested digest at
//! once. With line normalization enabled, CRLF and lone CR are rewritten to
//! LF before hashing so a checkout on any OS yields the same digest.

use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use thiserror::Error;

use steplink_metadata::DigestSet;

const BUFFER_SIZE: usize = 64 * 1024;

/// Errors for hash algorithm selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("at least one hash algorithm is required")]
    NoAlgorithms,
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Name used as the key in recorded digest sets
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Parse a list of algorithm names, rejecting unknown names and empty lists
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, HashError> {
        if names.is_empty() {
            return Err(HashError::NoAlgorithms);
        }
        let mut algorithms = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Self>, _>>()?;
        algorithms.sort();
        algorithms.dedup();
        Ok(algorithms)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(HashError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

enum State {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl State {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Self::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha384(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Rewrites CRLF and CR to LF across chunk boundaries
#[derive(Default)]
struct LineNormalizer {
    pending_cr: bool,
    out: Vec<u8>,
}

impl LineNormalizer {
    fn feed(&mut self, chunk: &[u8]) -> &[u8] {
        self.out.clear();
        for &b in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                self.out.push(b'\n');
                if b == b'\n' {
                    continue;
                }
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                self.out.push(b);
            }
        }
        &self.out
    }

    fn finish(&mut self) -> &[u8] {
        self.out.clear();
        if self.pending_cr {
            self.pending_cr = false;
            self.out.push(b'\n');
        }
        &self.out
    }
}

/// Stream `reader` into every algorithm in `algorithms`
pub fn digest_reader<R: Read>(
    mut reader: R,
    algorithms: &[HashAlgorithm],
    normalize_line_endings: bool,
) -> io::Result<DigestSet> {
    let mut states: Vec<(HashAlgorithm, State)> =
        algorithms.iter().map(|a| (*a, State::new(*a))).collect();
    let mut normalizer = normalize_line_endings.then(LineNormalizer::default);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let data = match normalizer.as_mut() {
            Some(normalizer) => normalizer.feed(&buffer[..n]),
            None => &buffer[..n],
        };
        for (_, state) in states.iter_mut() {
            state.update(data);
        }
    }

    if let Some(normalizer) = normalizer.as_mut() {
        let tail = normalizer.finish();
        for (_, state) in states.iter_mut() {
            state.update(tail);
        }
    }

    Ok(states
        .into_iter()
        .map(|(algorithm, state)| (algorithm.name().to_string(), state.finalize_hex()))
        .collect())
}

/// Digest an in-memory buffer
pub fn digest_bytes(
    data: &[u8],
    algorithms: &[HashAlgorithm],
    normalize_line_endings: bool,
) -> DigestSet {
    // Reading from a slice cannot fail.
    digest_reader(data, algorithms, normalize_line_endings).unwrap_or_default()
}

/// Compute SHA-256 of bytes and return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
