//! A value source backed by an explicit table of candidates.

use super::ValueSource;
use fuzz_core::{FuzzValue, ScalarKind};
use std::collections::HashMap;

/// Value source with caller-provided candidates per scalar kind.
///
/// Kinds without an entry produce no candidates.
#[derive(Debug, Clone, Default)]
pub struct StaticValueSource {
    values: HashMap<ScalarKind, Vec<FuzzValue>>,
    enums: HashMap<String, Vec<FuzzValue>>,
}

impl StaticValueSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidates for a scalar kind.
    pub fn with<V, I>(mut self, kind: ScalarKind, values: I) -> Self
    where
        V: Into<FuzzValue>,
        I: IntoIterator<Item = V>,
    {
        self.insert(kind, values);
        self
    }

    /// Set the candidates for every kind in `kinds`.
    pub fn with_kinds<V, I>(mut self, kinds: &[ScalarKind], values: I) -> Self
    where
        V: Into<FuzzValue>,
        I: IntoIterator<Item = V>,
    {
        let values: Vec<FuzzValue> = values.into_iter().map(Into::into).collect();
        for kind in kinds {
            self.values.insert(*kind, values.clone());
        }
        self
    }

    /// Override the candidates of one enum type.
    pub fn with_enum(mut self, name: impl Into<String>, numbers: &[i32]) -> Self {
        self.enums.insert(
            name.into(),
            numbers.iter().map(|n| FuzzValue::Enum(*n)).collect(),
        );
        self
    }

    /// Set the candidates for a scalar kind.
    pub fn insert<V, I>(&mut self, kind: ScalarKind, values: I)
    where
        V: Into<FuzzValue>,
        I: IntoIterator<Item = V>,
    {
        self.values
            .insert(kind, values.into_iter().map(Into::into).collect());
    }
}

impl ValueSource for StaticValueSource {
    fn values_for(&self, kind: ScalarKind) -> Vec<FuzzValue> {
        self.values.get(&kind).cloned().unwrap_or_default()
    }

    fn values_for_enum(&self, name: &str, numbers: &[i32]) -> Vec<FuzzValue> {
        match self.enums.get(name) {
            Some(values) => values.clone(),
            None => numbers.iter().map(|n| FuzzValue::Enum(*n)).collect(),
        }
    }
}
