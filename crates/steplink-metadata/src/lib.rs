//! steplink metadata types
//!
//! Defines the link record, its envelope and the canonical JSON encoding
//! that signatures are computed over.

pub mod canonical;
pub mod error;
pub mod link;
pub mod metablock;

pub use error::{CanonicalError, LinkError};
pub use link::{Artifacts, ByProducts, DigestSet, Link, MetadataType};
pub use metablock::{Metablock, Signature};
