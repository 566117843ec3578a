//! Dependencies declared in YAML.
//!
//! # YAML Format
//!
//! The `dependencies` key may live in the same file as the schema:
//!
//! ```yaml
//! dependencies:
//!   Other:
//!     - target: foo
//!       source: addr.house
//!       transform:
//!         type: add
//!         amount: 1
//! ```
//!
//! A missing `transform` copies the source value.

use crate::error::GeneratorError;
use crate::fuzzer::MessageFuzzer;
use crate::transform::TransformConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// One configured dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Path of the computed field
    pub target: String,

    /// Path of the field the value is computed from
    pub source: String,

    /// Transform to apply
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Configured dependencies, keyed by message type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySet {
    /// Dependencies per message type, applied in listed order
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<DependencyConfig>>,
}

impl DependencySet {
    /// Load from a YAML file. Keys other than `dependencies` are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GeneratorError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, GeneratorError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Total number of configured dependencies.
    pub fn len(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    /// Check if no dependencies are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach every configured dependency to its message fuzzer.
    ///
    /// Stops at the first rejected dependency; the ones before it stay
    /// attached.
    pub fn apply(
        &self,
        fuzzers: &mut BTreeMap<String, MessageFuzzer>,
    ) -> Result<usize, GeneratorError> {
        let mut applied = 0;
        for (message, dependencies) in &self.dependencies {
            let fuzzer = fuzzers
                .get_mut(message)
                .ok_or_else(|| GeneratorError::MessageNotFound(message.clone()))?;
            for dependency in dependencies {
                fuzzer
                    .add_dependency(
                        &dependency.target,
                        &dependency.source,
                        dependency.transform.build(),
                    )
                    .map_err(|source| GeneratorError::Dependency {
                        message: message.clone(),
                        source,
                    })?;
                applied += 1;
            }
        }
        if applied > 0 {
            info!("Attached {} configured dependencies", applied);
        }
        Ok(applied)
    }
}
