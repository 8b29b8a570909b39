//! Link metadata
//!
//! A link binds one supply-chain step to the artifacts it consumed
//! (materials), the artifacts it left behind (products) and what the
//! command printed and returned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LinkError;

/// Algorithm name → lowercase hex digest.
pub type DigestSet = BTreeMap<String, String>;

/// Normalized relative path → digests of the file at that path.
pub type Artifacts = BTreeMap<String, DigestSet>;

/// Metadata type tag, serialized as `_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataType {
    #[serde(rename = "link")]
    Link,
}

/// Captured output of the step command.
///
/// All fields are absent when the step ran without a command, which
/// serializes as an empty object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByProducts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    /// Exit status of the command (-1 when it was killed by a signal)
    #[serde(
        rename = "return-value",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub return_value: Option<i64>,
}

impl ByProducts {
    /// Byproducts of a step that executed no command
    pub fn empty() -> Self {
        Self::default()
    }

    /// Byproducts of an executed command
    pub fn from_output(stdout: String, stderr: String, return_value: i64) -> Self {
        Self {
            stdout: Some(stdout),
            stderr: Some(stderr),
            return_value: Some(return_value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none() && self.return_value.is_none()
    }
}

/// Link metadata for a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Always [`MetadataType::Link`]
    #[serde(rename = "_type")]
    pub metadata_type: MetadataType,

    /// Step name, matched against a layout by downstream verifiers
    pub name: String,

    /// Artifacts recorded before the command ran
    pub materials: Artifacts,

    /// Artifacts recorded after the command ran
    pub products: Artifacts,

    pub byproducts: ByProducts,

    /// Command tokens in execution order (empty for no command)
    pub command: Vec<String>,

    pub environment: BTreeMap<String, String>,
}

impl Link {
    /// Assemble a link from the results of a step run.
    ///
    /// Materials and products are stored as given. The same path may show
    /// up in both with different digests; that is what a modification looks
    /// like and is not checked here.
    pub fn assemble(
        name: impl Into<String>,
        materials: Artifacts,
        products: Artifacts,
        byproducts: ByProducts,
        command: Vec<String>,
        environment: BTreeMap<String, String>,
    ) -> Result<Self, LinkError> {
        let name = name.into();
        if name.is_empty() {
            return Err(LinkError::InvalidStepName(
                "step name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            metadata_type: MetadataType::Link,
            name,
            materials,
            products,
            byproducts,
            command,
            environment,
        })
    }
}
