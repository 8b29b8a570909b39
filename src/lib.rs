//! steplink - record and sign software supply chain steps
//!
//! A step run records the files it consumes (materials), optionally runs a
//! command, records the files it produces (products) and emits a signed
//! link describing all of it. Links are encoded canonically so the same run
//! over the same files always yields the same bytes.

pub mod artifact;
pub mod config;
pub mod pipeline;
pub mod runner;
pub mod signing;

pub use steplink_metadata::{
    canonical, Artifacts, ByProducts, CanonicalError, DigestSet, Link, LinkError, Metablock,
    MetadataType, Signature,
};

pub use artifact::{record_artifacts, ExcludeRules, HashAlgorithm, RecordOptions, StripRules};
pub use config::{ConfigError, Settings, StepConfig};
pub use pipeline::{run_and_write, run_step, StepError, StepResult};
pub use runner::{CommandRunner, ProcessRunner};
pub use signing::{Key, KeyPair, PublicKey};
