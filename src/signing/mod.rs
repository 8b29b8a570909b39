//! Ed25519 signing and verification of link metadata
//!
//! Signatures are computed over the canonical encoding of the link. A run
//! without a key yields an unsigned envelope, which is a valid result and
//! not an error.

mod envelope;
mod key;

pub use envelope::{
    link_file_name, read_envelope, sign, sign_link, verify, verify_envelope, write_envelope,
    SigningError, UNSIGNED_MARKER,
};
pub use key::{
    encode_private_key, encode_public_key, load_key, load_public_key, Key, KeyError, KeyPair,
    PublicKey, KEY_TYPE_ED25519, SCHEME_ED25519,
};
