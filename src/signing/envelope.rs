//! Signing links and storing envelopes

use ed25519_dalek::{Signature as Ed25519Signature, Verifier};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use steplink_metadata::{canonical, CanonicalError, Link, Metablock, Signature};

use super::key::{Key, KeyPair, PublicKey};
use crate::config::validate_step_name;

/// Stands in for the key id in the file name of an unsigned link
pub const UNSIGNED_MARKER: &str = "unsigned";

/// Errors from signing/verification and envelope storage
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("canonical encoding error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("malformed signature from key {keyid}: {reason}")]
    MalformedSignature { keyid: String, reason: String },

    #[error("step name {0:?} cannot be used in a file name")]
    InvalidFileName(String),

    #[error("I/O error at {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("invalid envelope at {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Sign the canonical encoding of `link`
pub fn sign(link: &Link, key: &KeyPair) -> Result<Signature, SigningError> {
    let payload = canonical::encode(link)?;
    Ok(Signature {
        keyid: key.keyid().to_string(),
        sig: hex::encode(key.sign_bytes(&payload)),
    })
}

/// Check one signature against `key`.
///
/// A signature from another key id, or one that does not match the link,
/// yields `Ok(false)`. Only a structurally broken signature is an error.
pub fn verify(link: &Link, signature: &Signature, key: &PublicKey) -> Result<bool, SigningError> {
    let malformed = |reason: String| SigningError::MalformedSignature {
        keyid: signature.keyid.clone(),
        reason,
    };

    let bytes = hex::decode(&signature.sig).map_err(|e| malformed(e.to_string()))?;
    let ed_signature =
        Ed25519Signature::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;

    if signature.keyid != key.keyid() {
        return Ok(false);
    }

    let payload = canonical::encode(link)?;
    Ok(key.verifying_key().verify(&payload, &ed_signature).is_ok())
}

/// Wrap `link` in an envelope, signed when a key is present
pub fn sign_link(link: Link, key: &Key) -> Result<Metablock, SigningError> {
    match key {
        Key::Present(pair) => {
            let signature = sign(&link, pair)?;
            info!(step = %link.name, keyid = %pair.keyid(), "signed link");
            Ok(Metablock {
                signed: link,
                signatures: vec![signature],
            })
        }
        Key::Absent => {
            warn!(step = %link.name, "no signing key, link left unsigned");
            Ok(Metablock::unsigned(link))
        }
    }
}

/// True if any signature in the envelope by `key` verifies
pub fn verify_envelope(envelope: &Metablock, key: &PublicKey) -> Result<bool, SigningError> {
    for signature in envelope.signatures_by(key.keyid()) {
        if verify(&envelope.signed, signature, key)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// File name for an envelope: `<step>.<keyid>.link` or `<step>.unsigned.link`
///
/// The full key id is used so links of the same step signed by different
/// keys never share a file.
pub fn link_file_name(envelope: &Metablock) -> Result<String, SigningError> {
    let name = &envelope.signed.name;
    validate_step_name(name).map_err(|_| SigningError::InvalidFileName(name.clone()))?;

    let keyid = envelope
        .signatures
        .first()
        .map(|s| s.keyid.as_str())
        .unwrap_or(UNSIGNED_MARKER);
    Ok(format!("{}.{}.link", name, keyid))
}

/// Write the canonical encoding of `envelope` into `dir`
///
/// Writes to a temporary file first and renames it into place.
pub fn write_envelope(envelope: &Metablock, dir: &Path) -> Result<PathBuf, SigningError> {
    let file_name = link_file_name(envelope)?;
    let bytes = canonical::encode(envelope)?;

    let final_path = dir.join(&file_name);
    let temp_path = dir.join(format!(".{}.tmp", file_name));
    let io_err = |path: &Path, source| SigningError::Io {
        path: path.display().to_string(),
        source,
    };

    let written = fs::write(&temp_path, &bytes)
        .map_err(|e| io_err(&temp_path, e))
        .and_then(|()| fs::rename(&temp_path, &final_path).map_err(|e| io_err(&final_path, e)));
    if let Err(e) = written {
        // Never leave a partial envelope behind.
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    info!(path = %final_path.display(), "wrote link metadata");
    Ok(final_path)
}

/// Read an envelope; any JSON rendering of it is accepted
pub fn read_envelope(path: &Path) -> Result<Metablock, SigningError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| SigningError::Io {
        path: display.clone(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| SigningError::Json {
        path: display,
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use steplink_metadata::{Artifacts, ByProducts, DigestSet};
    use tempfile::TempDir;

    fn sample_link(name: &str) -> Link {
        let mut digests = DigestSet::new();
        digests.insert("sha256".to_string(), "ab".repeat(32));
        let mut materials = Artifacts::new();
        materials.insert("src/main.txt".to_string(), digests);

        Link::assemble(
            name,
            materials,
            Artifacts::new(),
            ByProducts::from_output("ok\n".to_string(), String::new(), 0),
            vec!["echo".to_string(), "ok".to_string()],
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn pair(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let key = pair(1);
        let link = sample_link("build");

        let signature = sign(&link, &key).unwrap();
        assert_eq!(signature.keyid, key.keyid());
        // 64-byte Ed25519 signature, hex encoded
        assert_eq!(signature.sig.len(), 128);
        assert!(verify(&link, &signature, key.public_key()).unwrap());
    }

    #[test]
    fn test_signature_deterministic() {
        let key = pair(1);
        let link = sample_link("build");
        assert_eq!(sign(&link, &key).unwrap(), sign(&link, &key).unwrap());
    }

    #[test]
    fn test_tampered_link_fails() {
        let key = pair(1);
        let link = sample_link("build");
        let signature = sign(&link, &key).unwrap();

        let mut tampered = link.clone();
        tampered
            .materials
            .get_mut("src/main.txt")
            .unwrap()
            .insert("sha256".to_string(), "cd".repeat(32));
        assert!(!verify(&tampered, &signature, key.public_key()).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let link = sample_link("build");
        let signature = sign(&link, &pair(1)).unwrap();

        let other = pair(2);
        assert!(!verify(&link, &signature, other.public_key()).unwrap());

        // Same key id claimed, different key material.
        let forged = Signature {
            keyid: other.keyid().to_string(),
            sig: signature.sig.clone(),
        };
        assert!(!verify(&link, &forged, other.public_key()).unwrap());
    }

    #[test]
    fn test_malformed_signature() {
        let key = pair(1);
        let link = sample_link("build");

        let not_hex = Signature {
            keyid: key.keyid().to_string(),
            sig: "zz".to_string(),
        };
        assert!(matches!(
            verify(&link, &not_hex, key.public_key()),
            Err(SigningError::MalformedSignature { .. })
        ));

        let too_short = Signature {
            keyid: key.keyid().to_string(),
            sig: "00".repeat(10),
        };
        assert!(matches!(
            verify(&link, &too_short, key.public_key()),
            Err(SigningError::MalformedSignature { .. })
        ));
    }

    #[test]
    fn test_absent_key_leaves_unsigned() {
        let envelope = sign_link(sample_link("build"), &Key::Absent).unwrap();
        assert!(envelope.signatures.is_empty());
        assert!(!verify_envelope(&envelope, pair(1).public_key()).unwrap());
    }

    #[test]
    fn test_envelope_verifies() {
        let key = pair(3);
        let envelope = sign_link(sample_link("build"), &Key::from(key.clone())).unwrap();

        assert_eq!(envelope.signatures.len(), 1);
        assert!(verify_envelope(&envelope, key.public_key()).unwrap());
        assert!(!verify_envelope(&envelope, pair(4).public_key()).unwrap());
    }

    #[test]
    fn test_file_names() {
        let key = pair(5);
        let signed = sign_link(sample_link("build"), &Key::from(key.clone())).unwrap();
        assert_eq!(
            link_file_name(&signed).unwrap(),
            format!("build.{}.link", key.keyid())
        );

        let unsigned = Metablock::unsigned(sample_link("build"));
        assert_eq!(link_file_name(&unsigned).unwrap(), "build.unsigned.link");

        let other = sign_link(sample_link("build"), &Key::from(pair(6))).unwrap();
        assert_ne!(link_file_name(&signed).unwrap(), link_file_name(&other).unwrap());
    }

    #[test]
    fn test_file_name_rejects_separators() {
        for name in ["../escape", "a/b", "a\\b", ".."] {
            let envelope = Metablock::unsigned(sample_link(name));
            assert!(
                matches!(link_file_name(&envelope), Err(SigningError::InvalidFileName(_))),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let key = pair(7);
        let envelope = sign_link(sample_link("build"), &Key::from(key.clone())).unwrap();

        let path = write_envelope(&envelope, dir.path()).unwrap();
        assert_eq!(path, dir.path().join(link_file_name(&envelope).unwrap()));

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes, canonical::encode(&envelope).unwrap());

        let loaded = read_envelope(&path).unwrap();
        assert_eq!(loaded, envelope);
        assert!(verify_envelope(&loaded, key.public_key()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let envelope = Metablock::unsigned(sample_link("build"));
        // A non-empty directory in the way makes the rename fail.
        let blocker = dir.path().join("build.unsigned.link");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let result = write_envelope(&envelope, dir.path());

        assert!(matches!(result, Err(SigningError::Io { .. })));
        assert!(!dir.path().join(".build.unsigned.link.tmp").exists());
        assert!(blocker.join("keep").exists());
    }

    #[test]
    fn test_read_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let envelope = Metablock::unsigned(sample_link("build"));
        let path = dir.path().join("pretty.link");
        fs::write(&path, serde_json::to_string_pretty(&envelope).unwrap()).unwrap();

        assert_eq!(read_envelope(&path).unwrap(), envelope);
    }

    #[test]
    fn test_read_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_envelope(&dir.path().join("none.link")),
            Err(SigningError::Io { .. })
        ));

        let path = dir.path().join("bad.link");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(read_envelope(&path), Err(SigningError::Json { .. })));
    }
}
