//! Message fuzzers: one per message type, owning a field fuzzer per declared
//! field and the dependencies attached to the type.

use crate::dependency::DependencyGraph;
use crate::error::{DependencyError, GeneratorError};
use crate::field::{FieldFuzzer, MessageFieldFuzzer, ScalarFieldFuzzer};
use crate::permutation::{Permutation, Strategy};
use crate::source::ValueSource;
use crate::transform::Transform;
use fuzz_core::{DescriptorSet, FieldPath, FieldType, MessageDescriptor, SchemaError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Options applied while building fuzzers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzerOptions {
    /// Keep at most this many candidates per field, nested message fields
    /// included
    pub field_limit: Option<usize>,
}

/// Fuzzer for one message type.
///
/// Dependencies attached to a fuzzer apply to it alone. The fuzzers built
/// for its nested message fields stay dependency-free.
#[derive(Debug, Clone)]
pub struct MessageFuzzer {
    schema: Arc<DescriptorSet>,
    descriptor: MessageDescriptor,
    fields: Vec<FieldFuzzer>,
    dependencies: DependencyGraph,
}

impl MessageFuzzer {
    /// Build the fuzzer for `message`, drawing scalar candidates from
    /// `source`.
    pub fn new(
        schema: Arc<DescriptorSet>,
        message: &str,
        source: &dyn ValueSource,
        options: &FuzzerOptions,
    ) -> Result<Self, GeneratorError> {
        let mut stack = Vec::new();
        Self::build(&schema, message, source, options, &mut stack)
    }

    fn build(
        schema: &Arc<DescriptorSet>,
        message: &str,
        source: &dyn ValueSource,
        options: &FuzzerOptions,
        stack: &mut Vec<String>,
    ) -> Result<Self, GeneratorError> {
        if stack.iter().any(|m| m == message) {
            let mut cycle = stack.clone();
            cycle.push(message.to_string());
            return Err(SchemaError::RecursiveMessage { cycle }.into());
        }
        let descriptor = schema.require_message(message)?.clone();

        stack.push(message.to_string());
        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for field in &descriptor.fields {
            let fuzzer = match &field.field_type {
                FieldType::Scalar(kind) => FieldFuzzer::Scalar(ScalarFieldFuzzer::new(
                    field.clone(),
                    source.values_for(*kind),
                    options.field_limit,
                )),
                FieldType::Enum { name, values } => FieldFuzzer::Scalar(ScalarFieldFuzzer::new(
                    field.clone(),
                    source.values_for_enum(name, values),
                    options.field_limit,
                )),
                FieldType::Message { name } => {
                    let nested = Self::build(schema, name, source, options, stack)?;
                    FieldFuzzer::Message(MessageFieldFuzzer::new(
                        field.clone(),
                        message,
                        nested,
                        options.field_limit,
                    ))
                }
            };
            fields.push(fuzzer);
        }
        stack.pop();

        debug!(
            "Built fuzzer for message '{}' with {} fields",
            message,
            fields.len()
        );
        Ok(Self {
            schema: Arc::clone(schema),
            descriptor,
            fields,
            dependencies: DependencyGraph::new(),
        })
    }

    /// Message type name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The schema this fuzzer was built from.
    pub fn schema(&self) -> &DescriptorSet {
        &self.schema
    }

    /// Message descriptor.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Field fuzzers, in declaration order.
    pub fn fields(&self) -> &[FieldFuzzer] {
        &self.fields
    }

    /// Get a field fuzzer by name.
    pub fn field(&self, name: &str) -> Option<&FieldFuzzer> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Attached dependencies.
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    /// Compute `target` from `source` with `transform` in every instance.
    ///
    /// Both are dotted paths relative to this message and may reach into
    /// nested message fields. The target is removed from the independent
    /// product. On error the fuzzer is left unchanged.
    pub fn add_dependency(
        &mut self,
        target: &str,
        source: &str,
        transform: Transform,
    ) -> Result<(), DependencyError> {
        let dependency = self.dependencies.add(
            &self.schema,
            &self.descriptor.name,
            target,
            source,
            transform,
        )?;
        debug!(
            "Added dependency on '{}': {} <- {} via {}",
            self.descriptor.name,
            dependency.target(),
            dependency.source(),
            dependency.transform()
        );
        Ok(())
    }

    /// Enumerate the Cartesian product of the independent fields.
    pub fn permute(&self) -> Permutation<'_> {
        Permutation::new(self, Strategy::Permute)
    }

    /// Like [`permute`](Self::permute), stopping after `limit` instances
    /// (zero means unlimited).
    pub fn permute_with_limit(&self, limit: u64) -> Permutation<'_> {
        self.permute().with_limit(limit)
    }

    /// One partition of [`permute`](Self::permute), split on the first
    /// independent field's candidate index.
    pub fn permute_partition(
        &self,
        shard: usize,
        shards: usize,
    ) -> Result<Permutation<'_>, GeneratorError> {
        self.permute().partition(shard, shards)
    }

    /// Enumerate the independent fields in lock step.
    pub fn linear(&self) -> Permutation<'_> {
        Permutation::new(self, Strategy::Linear)
    }

    /// Like [`linear`](Self::linear), stopping after `limit` instances
    /// (zero means unlimited).
    pub fn linear_with_limit(&self, limit: u64) -> Permutation<'_> {
        self.linear().with_limit(limit)
    }

    /// Enumerate with the given strategy.
    pub fn enumerate(&self, strategy: Strategy) -> Permutation<'_> {
        Permutation::new(self, strategy)
    }

    /// Number of items the strategy yields, or `None` if it does not fit
    /// in a `u128`.
    pub fn count(&self, strategy: Strategy) -> Option<u128> {
        self.count_excluding(strategy, &[])
    }

    pub(crate) fn count_excluding(
        &self,
        strategy: Strategy,
        excluded: &[FieldPath],
    ) -> Option<u128> {
        let mut counts = self
            .fields
            .iter()
            .zip(self.exclusions(excluded))
            .filter_map(|(field, excluded)| excluded.map(|ex| field.count(strategy, &ex)));

        match strategy {
            Strategy::Permute => {
                counts.try_fold(1u128, |total, count| total.checked_mul(count?))
            }
            Strategy::Linear => {
                let mut shortest: Option<u128> = None;
                for count in counts {
                    let count = count?;
                    shortest = Some(shortest.map_or(count, |s| s.min(count)));
                }
                Some(shortest.unwrap_or(1))
            }
        }
    }

    /// For each field, the sub-paths to leave unset inside it, or `None`
    /// when the whole field is computed. Combines this fuzzer's own targets
    /// with paths a parent computes.
    pub(crate) fn exclusions(&self, parent: &[FieldPath]) -> Vec<Option<Vec<FieldPath>>> {
        let excluded: Vec<&FieldPath> = self.dependencies.targets().chain(parent).collect();
        self.fields
            .iter()
            .map(|field| {
                let name = field.name();
                let mut below = Vec::new();
                for path in excluded.iter().filter(|p| p.head() == name) {
                    match path.tail() {
                        Some(tail) => below.push(tail),
                        None => return None,
                    }
                }
                Some(below)
            })
            .collect()
    }
}

/// Build a fuzzer for every message type in the schema.
pub fn build_fuzzers(
    schema: &DescriptorSet,
    source: &dyn ValueSource,
) -> Result<BTreeMap<String, MessageFuzzer>, GeneratorError> {
    build_fuzzers_with_options(schema, source, &FuzzerOptions::default())
}

/// Build a fuzzer for every message type with explicit options.
pub fn build_fuzzers_with_options(
    schema: &DescriptorSet,
    source: &dyn ValueSource,
    options: &FuzzerOptions,
) -> Result<BTreeMap<String, MessageFuzzer>, GeneratorError> {
    let schema = Arc::new(schema.clone());
    let mut fuzzers = BTreeMap::new();
    for name in schema.message_names() {
        let fuzzer = MessageFuzzer::new(Arc::clone(&schema), name, source, options)?;
        fuzzers.insert(name.to_string(), fuzzer);
    }
    info!("Built {} message fuzzers", fuzzers.len());
    Ok(fuzzers)
}
