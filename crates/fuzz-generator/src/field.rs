//! Per-field candidate sequences.
//!
//! A scalar field draws its candidates from the value source once, when the
//! fuzzer is built. A nested message field treats every instance of the
//! nested message's own enumeration as one candidate.

use crate::conformance::conform_scalar;
use crate::error::TypeConformanceError;
use crate::fuzzer::MessageFuzzer;
use crate::permutation::{Permutation, Strategy};
use fuzz_core::{FieldDescriptor, FieldPath, FuzzValue, ResolvedInstance};
use tracing::warn;

/// Fuzzer for one field of a message.
#[derive(Debug, Clone)]
pub enum FieldFuzzer {
    /// Scalar or enum field
    Scalar(ScalarFieldFuzzer),

    /// Nested message field
    Message(MessageFieldFuzzer),
}

impl FieldFuzzer {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Field descriptor.
    pub fn descriptor(&self) -> &FieldDescriptor {
        match self {
            Self::Scalar(f) => &f.descriptor,
            Self::Message(f) => &f.descriptor,
        }
    }

    /// The field's candidate sequence.
    pub fn candidates(&self) -> Candidates<'_> {
        self.cursor(Strategy::Permute, &[])
    }

    /// A candidate cursor for the given strategy. Paths in `excluded` are
    /// relative to this field and left unset in nested instances.
    pub(crate) fn cursor(&self, strategy: Strategy, excluded: &[FieldPath]) -> Candidates<'_> {
        let inner = match self {
            Self::Scalar(f) => CandidatesInner::Scalar(f.values.iter()),
            Self::Message(f) => {
                let mut permutation = Permutation::nested(&f.fuzzer, strategy, excluded.to_vec());
                if let Some(limit) = f.limit {
                    permutation = permutation.with_limit(limit as u64);
                }
                CandidatesInner::Message {
                    field: f,
                    permutation,
                }
            }
        };
        Candidates { inner }
    }

    /// Number of candidates `cursor` would produce, or `None` on overflow.
    pub(crate) fn count(&self, strategy: Strategy, excluded: &[FieldPath]) -> Option<u128> {
        match self {
            Self::Scalar(f) => Some(f.values.len() as u128),
            Self::Message(f) => match (f.fuzzer.count_excluding(strategy, excluded), f.limit) {
                (Some(count), Some(limit)) => Some(count.min(limit as u128)),
                (None, Some(limit)) => Some(limit as u128),
                (count, None) => count,
            },
        }
    }
}

/// A field whose candidates come from the value source.
#[derive(Debug, Clone)]
pub struct ScalarFieldFuzzer {
    descriptor: FieldDescriptor,
    values: Vec<FuzzValue>,
}

impl ScalarFieldFuzzer {
    /// Create a fuzzer from raw source values.
    ///
    /// Values that do not fit the field's type are dropped. Candidates of a
    /// repeated field are one-element lists. At most `limit` candidates are
    /// kept.
    pub fn new(descriptor: FieldDescriptor, raw: Vec<FuzzValue>, limit: Option<usize>) -> Self {
        let offered = raw.len();
        let mut values: Vec<FuzzValue> = raw
            .iter()
            .filter_map(|value| conform_scalar(&descriptor.field_type, value))
            .collect();
        if values.len() < offered {
            warn!(
                "Dropped {} source values that do not fit field '{}' ({})",
                offered - values.len(),
                descriptor.name,
                descriptor.field_type
            );
        }
        if let Some(limit) = limit {
            values.truncate(limit);
        }
        if descriptor.is_repeated() {
            values = values
                .into_iter()
                .map(|v| FuzzValue::List(vec![v]))
                .collect();
        }
        Self { descriptor, values }
    }

    /// Field descriptor.
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// The cached candidates.
    pub fn values(&self) -> &[FuzzValue] {
        &self.values
    }
}

/// A field holding a nested message.
#[derive(Debug, Clone)]
pub struct MessageFieldFuzzer {
    descriptor: FieldDescriptor,
    parent: String,
    fuzzer: Box<MessageFuzzer>,
    limit: Option<usize>,
}

impl MessageFieldFuzzer {
    /// Wrap the fuzzer of the nested message type.
    pub fn new(
        descriptor: FieldDescriptor,
        parent: impl Into<String>,
        fuzzer: MessageFuzzer,
        limit: Option<usize>,
    ) -> Self {
        Self {
            descriptor,
            parent: parent.into(),
            fuzzer: Box::new(fuzzer),
            limit,
        }
    }

    /// Field descriptor.
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// The nested message's fuzzer.
    pub fn fuzzer(&self) -> &MessageFuzzer {
        &self.fuzzer
    }

    fn wrap(&self, instance: ResolvedInstance) -> FuzzValue {
        let value = FuzzValue::Message(instance);
        if self.descriptor.is_repeated() {
            FuzzValue::List(vec![value])
        } else {
            value
        }
    }
}

/// Lazy candidate sequence of one field.
///
/// Nested conformance failures are reported relative to the field's parent
/// message.
pub struct Candidates<'a> {
    inner: CandidatesInner<'a>,
}

enum CandidatesInner<'a> {
    Scalar(std::slice::Iter<'a, FuzzValue>),
    Message {
        field: &'a MessageFieldFuzzer,
        permutation: Permutation<'a>,
    },
}

impl Iterator for Candidates<'_> {
    type Item = Result<FuzzValue, TypeConformanceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            CandidatesInner::Scalar(values) => values.next().cloned().map(Ok),
            CandidatesInner::Message { field, permutation } => {
                let item = permutation.next()?;
                Some(
                    item.map(|instance| field.wrap(instance))
                        .map_err(|e| e.nested_in(&field.parent, &field.descriptor.name)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuzz_core::{FieldType, ScalarKind};

    #[test]
    fn test_scalar_candidates() {
        let field = FieldFuzzer::Scalar(ScalarFieldFuzzer::new(
            FieldDescriptor::new("house", ScalarKind::Int32),
            vec![FuzzValue::Int(-1), FuzzValue::Int(0), FuzzValue::Int(256)],
            None,
        ));
        let values: Vec<FuzzValue> = field.candidates().map(Result::unwrap).collect();
        assert_eq!(
            values,
            vec![FuzzValue::Int(-1), FuzzValue::Int(0), FuzzValue::Int(256)]
        );
        assert_eq!(field.count(Strategy::Permute, &[]), Some(3));
        assert_eq!(field.name(), "house");
    }

    #[test]
    fn test_scalar_drops_unfit_values() {
        let fuzzer = ScalarFieldFuzzer::new(
            FieldDescriptor::new("foo", ScalarKind::UInt32),
            vec![FuzzValue::Int(-1), FuzzValue::Int(0), FuzzValue::Int(1 << 40)],
            None,
        );
        assert_eq!(fuzzer.values(), &[FuzzValue::UInt(0)]);
    }

    #[test]
    fn test_scalar_limit_and_repeated() {
        let fuzzer = ScalarFieldFuzzer::new(
            FieldDescriptor::repeated("tags", ScalarKind::String),
            vec!["a".into(), "b".into(), "c".into()],
            Some(2),
        );
        assert_eq!(
            fuzzer.values(),
            &[
                FuzzValue::List(vec![FuzzValue::String("a".into())]),
                FuzzValue::List(vec![FuzzValue::String("b".into())]),
            ]
        );
    }

    #[test]
    fn test_enum_candidates() {
        let fuzzer = ScalarFieldFuzzer::new(
            FieldDescriptor::new("color", FieldType::enumeration("Color", vec![0, 2])),
            vec![FuzzValue::Enum(0), FuzzValue::Enum(2)],
            None,
        );
        assert_eq!(fuzzer.values(), &[FuzzValue::Enum(0), FuzzValue::Enum(2)]);
    }
}
