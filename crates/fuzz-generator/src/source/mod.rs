//! Value sources supply the representative candidate values per scalar kind.
//!
//! A source must be deterministic: the same kind always produces the same
//! values in the same order for the lifetime of a fuzzing session.

pub mod corpus;
pub mod static_values;

pub use corpus::{CorpusOptions, CorpusValueSource};
pub use static_values::StaticValueSource;

use fuzz_core::{FuzzValue, ScalarKind};

/// Supplies ordered, finite candidate sequences for scalar kinds.
pub trait ValueSource: Send + Sync {
    /// Candidate values for a scalar kind. May be empty.
    fn values_for(&self, kind: ScalarKind) -> Vec<FuzzValue>;

    /// Candidate values for an enum type with the given declared numbers.
    ///
    /// Defaults to every declared number in declaration order.
    fn values_for_enum(&self, _name: &str, numbers: &[i32]) -> Vec<FuzzValue> {
        numbers.iter().map(|n| FuzzValue::Enum(*n)).collect()
    }
}
