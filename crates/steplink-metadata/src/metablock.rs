//! Signed envelope around a link

use serde::{Deserialize, Serialize};

use crate::link::Link;

/// One signature over the canonical encoding of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Id of the key that produced the signature
    pub keyid: String,

    /// Lowercase hex signature bytes
    pub sig: String,
}

/// Envelope written to disk: the link plus zero or more signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metablock {
    pub signed: Link,

    /// Empty for an unsigned link
    pub signatures: Vec<Signature>,
}

impl Metablock {
    /// Wrap a link without signing it
    pub fn unsigned(link: Link) -> Self {
        Self {
            signed: link,
            signatures: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Signatures made by the given key id
    pub fn signatures_by<'a>(&'a self, keyid: &'a str) -> impl Iterator<Item = &'a Signature> {
        self.signatures.iter().filter(move |s| s.keyid == keyid)
    }
}
