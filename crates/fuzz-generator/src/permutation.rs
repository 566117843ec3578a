//! The permutation engine: lazy enumeration of resolved instances.
//!
//! # Algorithm
//!
//! Every field that is not computed by a dependency is an *axis* with its
//! own candidate cursor. With [`Strategy::Permute`] the axes advance like an
//! odometer: the last declared field varies fastest and the first declared
//! field is the outermost axis, so the instance count is the product of the
//! axis lengths. With [`Strategy::Linear`] all axes advance together and
//! the count is the shortest axis length.
//!
//! For every combination the engine fills computed fields with a
//! placeholder, then applies the dependencies in evaluation order, checking
//! each computed value against the target field's type.
//!
//! Each call to `next` advances one combination. Exhausted nested cursors
//! are dropped and reopened when their axis wraps, and dropping the
//! [`Permutation`] releases every nested cursor.

use crate::conformance::{conform, describe};
use crate::dependency::Dependency;
use crate::error::{GeneratorError, TypeConformanceError};
use crate::field::{Candidates, FieldFuzzer};
use crate::fuzzer::MessageFuzzer;
use fuzz_core::{FieldPath, FuzzValue, ResolvedInstance};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;
use tracing::{debug, warn};

/// How independent fields are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Cartesian product of all candidate sequences
    #[default]
    Permute,

    /// Candidate sequences advanced in lock step
    Linear,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permute => f.write_str("permute"),
            Self::Linear => f.write_str("linear"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permute" => Ok(Self::Permute),
            "linear" => Ok(Self::Linear),
            other => Err(format!("Unknown strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Done,
}

struct Slot<'a> {
    field: &'a FieldFuzzer,
    /// Paths below this field left for the parent to compute; `None` when
    /// the whole field is computed
    excluded: Option<Vec<FieldPath>>,
    cursor: Option<Candidates<'a>>,
    current: Option<Result<FuzzValue, TypeConformanceError>>,
}

/// Lazy sequence of resolved instances of one message type.
///
/// Yields `Err` for a combination whose computed values do not conform;
/// enumeration continues with the next combination.
pub struct Permutation<'a> {
    fuzzer: &'a MessageFuzzer,
    strategy: Strategy,
    slots: Vec<Slot<'a>>,
    /// Slot indices of the independent fields, in declaration order
    axes: Vec<usize>,
    order: Vec<&'a Dependency>,
    shard: usize,
    shards: usize,
    limit: Option<u64>,
    produced: u64,
    state: State,
    nested: bool,
}

impl<'a> Permutation<'a> {
    pub(crate) fn new(fuzzer: &'a MessageFuzzer, strategy: Strategy) -> Self {
        Self::build(fuzzer, strategy, Vec::new(), false)
    }

    pub(crate) fn nested(
        fuzzer: &'a MessageFuzzer,
        strategy: Strategy,
        excluded: Vec<FieldPath>,
    ) -> Self {
        Self::build(fuzzer, strategy, excluded, true)
    }

    fn build(
        fuzzer: &'a MessageFuzzer,
        strategy: Strategy,
        excluded: Vec<FieldPath>,
        nested: bool,
    ) -> Self {
        let slots: Vec<Slot<'a>> = fuzzer
            .fields()
            .iter()
            .zip(fuzzer.exclusions(&excluded))
            .map(|(field, excluded)| Slot {
                field,
                excluded,
                cursor: None,
                current: None,
            })
            .collect();
        let axes = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.excluded.is_some())
            .map(|(i, _)| i)
            .collect();

        Self {
            fuzzer,
            strategy,
            slots,
            axes,
            order: fuzzer.dependencies().evaluation_order(),
            shard: 0,
            shards: 1,
            limit: None,
            produced: 0,
            state: State::Fresh,
            nested,
        }
    }

    /// Stop after `limit` instances. Zero means unlimited.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Restrict the enumeration to the combinations whose first independent
    /// field's candidate index is congruent to `shard` modulo `shards`.
    ///
    /// The partitions for `0..shards` together yield exactly the unpartitioned
    /// sequence. Restarts the enumeration.
    pub fn partition(mut self, shard: usize, shards: usize) -> Result<Self, GeneratorError> {
        if shards == 0 || shard >= shards {
            return Err(GeneratorError::InvalidPartition { shard, shards });
        }
        self.shard = shard;
        self.shards = shards;
        self.restart();
        Ok(self)
    }

    /// Rewind to the first combination.
    pub fn restart(&mut self) {
        self.release();
        self.produced = 0;
        self.state = State::Fresh;
    }

    /// The combination strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of items yielded so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn release(&mut self) {
        for slot in &mut self.slots {
            slot.cursor = None;
            slot.current = None;
        }
    }

    fn finish(&mut self) {
        if self.state != State::Done && !self.nested {
            debug!(
                "Enumeration of '{}' finished after {} instances",
                self.fuzzer.name(),
                self.produced
            );
        }
        self.state = State::Done;
        self.release();
    }

    /// Open a fresh cursor on axis `n` and move it to its `skip`-th
    /// candidate.
    fn open_axis(&mut self, n: usize, skip: usize) -> bool {
        let strategy = self.strategy;
        let slot = &mut self.slots[self.axes[n]];
        let excluded = slot.excluded.as_deref().unwrap_or_default();
        let mut cursor = slot.field.cursor(strategy, excluded);
        slot.current = cursor.nth(skip);
        slot.cursor = Some(cursor);
        slot.current.is_some()
    }

    /// Move axis `n` forward by `skip + 1` candidates.
    fn step_axis(&mut self, n: usize, skip: usize) -> bool {
        let slot = &mut self.slots[self.axes[n]];
        match slot.cursor.as_mut().and_then(|cursor| cursor.nth(skip)) {
            Some(value) => {
                slot.current = Some(value);
                true
            }
            None => false,
        }
    }

    fn start(&mut self) -> bool {
        if self.axes.is_empty() {
            return self.shard == 0;
        }
        for n in 0..self.axes.len() {
            let skip = match self.strategy {
                Strategy::Permute if n > 0 => 0,
                _ => self.shard,
            };
            if !self.open_axis(n, skip) {
                return false;
            }
        }
        true
    }

    fn advance(&mut self) -> bool {
        let stride_skip = self.shards - 1;
        match self.strategy {
            Strategy::Permute => {
                for n in (0..self.axes.len()).rev() {
                    let skip = if n == 0 { stride_skip } else { 0 };
                    if self.step_axis(n, skip) {
                        return true;
                    }
                    if n == 0 || !self.open_axis(n, 0) {
                        return false;
                    }
                }
                false
            }
            Strategy::Linear => {
                if self.axes.is_empty() {
                    return false;
                }
                for n in 0..self.axes.len() {
                    if !self.step_axis(n, stride_skip) {
                        return false;
                    }
                }
                true
            }
        }
    }

    fn assemble(&self) -> Result<ResolvedInstance, TypeConformanceError> {
        let mut instance = ResolvedInstance::new(self.fuzzer.name());
        for slot in &self.slots {
            let value = match &slot.current {
                Some(Ok(value)) => value.clone(),
                Some(Err(e)) => return Err(e.clone()),
                None => FuzzValue::Null,
            };
            instance.push(slot.field.name(), value);
        }
        for dependency in &self.order {
            self.resolve(dependency, &mut instance)?;
        }
        Ok(instance)
    }

    fn resolve(
        &self,
        dependency: &Dependency,
        instance: &mut ResolvedInstance,
    ) -> Result<(), TypeConformanceError> {
        let source = instance
            .get_path(dependency.source())
            .cloned()
            .unwrap_or(FuzzValue::Null);
        let transform = dependency.transform();

        let Some(output) = transform.apply(&source) else {
            return Err(TypeConformanceError {
                message: self.fuzzer.name().to_string(),
                path: dependency.source().clone(),
                value: source,
                expected: format!(
                    "{} input for '{}'",
                    transform.input_shape(),
                    transform.name()
                ),
            });
        };
        let Some(value) = conform(self.fuzzer.schema(), dependency.target_field(), &output) else {
            return Err(TypeConformanceError {
                message: self.fuzzer.name().to_string(),
                path: dependency.target().clone(),
                value: output,
                expected: describe(dependency.target_field()),
            });
        };

        instance
            .set_path(dependency.target(), value)
            .map_err(|value| TypeConformanceError {
                message: self.fuzzer.name().to_string(),
                path: dependency.target().clone(),
                value,
                expected: format!("{} at a populated path", describe(dependency.target_field())),
            })
    }
}

impl Iterator for Permutation<'_> {
    type Item = Result<ResolvedInstance, TypeConformanceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            self.finish();
            return None;
        }
        let ready = match self.state {
            State::Fresh => self.start(),
            State::Running => self.advance(),
            State::Done => return None,
        };
        if !ready {
            self.finish();
            return None;
        }
        self.state = State::Running;
        self.produced += 1;

        let item = self.assemble();
        if let Err(e) = &item {
            if !self.nested {
                warn!(
                    "Instance {} of '{}' does not conform: {}",
                    self.produced,
                    self.fuzzer.name(),
                    e
                );
            }
        }
        Some(item)
    }
}

impl FusedIterator for Permutation<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzer::{FuzzerOptions, MessageFuzzer};
    use crate::source::StaticValueSource;
    use crate::transform::Transform;
    use fuzz_core::{DescriptorSet, FieldDescriptor, FieldType, MessageDescriptor, ScalarKind};
    use std::sync::Arc;

    fn schema() -> Arc<DescriptorSet> {
        Arc::new(
            DescriptorSet::new(vec![
                MessageDescriptor::new(
                    "Pair",
                    vec![
                        FieldDescriptor::new("a", ScalarKind::Int32),
                        FieldDescriptor::new("b", ScalarKind::String),
                    ],
                ),
                MessageDescriptor::new("Empty", vec![]),
                MessageDescriptor::new(
                    "Holder",
                    vec![
                        FieldDescriptor::new("pair", FieldType::message("Pair")),
                        FieldDescriptor::new("flag", ScalarKind::Bool),
                    ],
                ),
            ])
            .unwrap(),
        )
    }

    fn source() -> StaticValueSource {
        StaticValueSource::new()
            .with(ScalarKind::Int32, [1i64, 2, 3])
            .with(ScalarKind::String, ["x", "y"])
            .with(ScalarKind::Bool, [true, false])
    }

    fn fuzzer(message: &str) -> MessageFuzzer {
        MessageFuzzer::new(schema(), message, &source(), &FuzzerOptions::default()).unwrap()
    }

    fn pairs(permutation: Permutation<'_>) -> Vec<(i64, String)> {
        permutation
            .map(|item| {
                let instance = item.unwrap();
                let a = match instance.get("a") {
                    Some(FuzzValue::Int(a)) => *a,
                    other => panic!("unexpected a: {other:?}"),
                };
                let b = instance.get("b").and_then(FuzzValue::as_str).unwrap().to_string();
                (a, b)
            })
            .collect()
    }

    #[test]
    fn test_last_field_varies_fastest() {
        let fuzzer = fuzzer("Pair");
        let expected: Vec<(i64, String)> = [1i64, 2, 3]
            .into_iter()
            .flat_map(|a| ["x", "y"].into_iter().map(move |b| (a, b.to_string())))
            .collect();
        assert_eq!(pairs(fuzzer.permute()), expected);
    }

    #[test]
    fn test_linear_zips() {
        let fuzzer = fuzzer("Pair");
        assert_eq!(
            pairs(fuzzer.linear()),
            vec![(1, "x".to_string()), (2, "y".to_string())]
        );
    }

    #[test]
    fn test_limit() {
        let fuzzer = fuzzer("Pair");
        assert_eq!(fuzzer.permute_with_limit(4).count(), 4);
        assert_eq!(fuzzer.permute_with_limit(0).count(), 6);
        assert_eq!(fuzzer.permute_with_limit(100).count(), 6);
        assert_eq!(fuzzer.linear_with_limit(1).count(), 1);
    }

    #[test]
    fn test_partitions_cover_sequence() {
        let fuzzer = fuzzer("Pair");
        let full = pairs(fuzzer.permute());

        let mut union = Vec::new();
        for shard in 0..2 {
            let part = pairs(fuzzer.permute_partition(shard, 2).unwrap());
            for (a, _) in &part {
                assert_eq!(((*a - 1) as usize) % 2, shard);
            }
            union.extend(part);
        }
        union.sort();
        let mut sorted = full.clone();
        sorted.sort();
        assert_eq!(union, sorted);

        let linear: Vec<_> = pairs(fuzzer.linear().partition(1, 2).unwrap());
        assert_eq!(linear, vec![(2, "y".to_string())]);
    }

    #[test]
    fn test_invalid_partition() {
        let fuzzer = fuzzer("Pair");
        assert!(matches!(
            fuzzer.permute_partition(0, 0),
            Err(GeneratorError::InvalidPartition { .. })
        ));
        assert!(matches!(
            fuzzer.permute_partition(2, 2),
            Err(GeneratorError::InvalidPartition { .. })
        ));
    }

    #[test]
    fn test_empty_message_yields_one_instance() {
        let fuzzer = fuzzer("Empty");
        let instances: Vec<_> = fuzzer.permute().collect();
        assert_eq!(instances.len(), 1);
        assert!(instances[0].as_ref().unwrap().is_empty());
        assert_eq!(fuzzer.linear().count(), 1);
        assert_eq!(fuzzer.permute_partition(1, 2).unwrap().count(), 0);
    }

    #[test]
    fn test_restart() {
        let fuzzer = fuzzer("Holder");
        let mut permutation = fuzzer.permute();
        let first: Vec<_> = permutation.by_ref().take(5).collect();
        assert_eq!(permutation.produced(), 5);

        permutation.restart();
        let again: Vec<_> = permutation.take(5).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_nested_outer_axis() {
        let fuzzer = fuzzer("Holder");
        let instances: Vec<ResolvedInstance> = fuzzer.permute().map(Result::unwrap).collect();
        assert_eq!(instances.len(), 12);
        assert_eq!(instances[0].get("flag"), Some(&FuzzValue::Bool(true)));
        assert_eq!(instances[1].get("flag"), Some(&FuzzValue::Bool(false)));
        assert_eq!(instances[0].get("pair"), instances[1].get("pair"));
        assert_ne!(instances[1].get("pair"), instances[2].get("pair"));
    }

    #[test]
    fn test_conformance_error_continues() {
        let mut fuzzer = fuzzer("Pair");
        fuzzer
            .add_dependency("a", "b", Transform::new("len", |s: String| s.len() as i64 - 2))
            .unwrap();
        let items: Vec<_> = fuzzer.permute().collect();
        assert_eq!(items.len(), 2);
        for item in items {
            let instance = item.unwrap();
            assert_eq!(instance.get("a"), Some(&FuzzValue::Int(-1)));
        }

        let mut fuzzer = self::fuzzer("Holder");
        fuzzer
            .add_dependency(
                "pair.a",
                "flag",
                Transform::new("flag", |f: bool| if f { 1i64 } else { 1i64 << 40 }),
            )
            .unwrap();
        let items: Vec<_> = fuzzer.permute().collect();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.message, "Holder");
        assert_eq!(err.path.to_string(), "pair.a");
        assert_eq!(err.value, FuzzValue::Int(1 << 40));
        assert!(items[2].is_ok());
        assert!(items[3].is_err());
    }

    #[test]
    fn test_nested_target_is_written() {
        let mut fuzzer = fuzzer("Holder");
        fuzzer
            .add_dependency("pair.a", "flag", Transform::new("flag", |f: bool| i64::from(f)))
            .unwrap();
        for item in fuzzer.permute() {
            let instance = item.unwrap();
            let flag = instance.get("flag").and_then(FuzzValue::as_bool).unwrap();
            let pair = instance.get("pair").and_then(FuzzValue::as_message).unwrap();
            assert_eq!(pair.get("a"), Some(&FuzzValue::Int(i64::from(flag))));
        }
    }

    #[test]
    fn test_message_target_conforms_recursively() {
        let mut fuzzer = fuzzer("Holder");
        fuzzer
            .add_dependency(
                "pair",
                "flag",
                Transform::new("bad", |_f: bool| {
                    ResolvedInstance::with_fields(
                        "Pair",
                        [("a".to_string(), FuzzValue::String("not an int".into()))],
                    )
                }),
            )
            .unwrap();
        let items: Vec<_> = fuzzer.permute().collect();
        assert_eq!(items.len(), 2);
        for item in &items {
            let err = item.as_ref().unwrap_err();
            assert_eq!(err.message, "Holder");
            assert_eq!(err.path.to_string(), "pair");
        }
    }

    #[test]
    fn test_message_target_accepts_well_formed_instance() {
        let mut fuzzer = fuzzer("Holder");
        fuzzer
            .add_dependency(
                "pair",
                "flag",
                Transform::new("pair", |f: bool| {
                    ResolvedInstance::with_fields(
                        "Pair",
                        [
                            ("a".to_string(), FuzzValue::UInt(u64::from(f))),
                            ("b".to_string(), FuzzValue::String("z".into())),
                        ],
                    )
                }),
            )
            .unwrap();
        let instances: Vec<ResolvedInstance> = fuzzer.permute().map(Result::unwrap).collect();
        assert_eq!(instances.len(), 2);
        let pair = instances[0].get("pair").and_then(FuzzValue::as_message).unwrap();
        // unsigned source normalised to the int32 representation
        assert_eq!(pair.get("a"), Some(&FuzzValue::Int(1)));
        assert_eq!(pair.get("b"), Some(&FuzzValue::String("z".into())));
    }
}
