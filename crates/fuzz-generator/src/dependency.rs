//! Dependency edges between fields of one message and their evaluation order.
//!
//! Edges are keyed by full field paths, so dependencies that reach into
//! nested messages take part in the same cycle and ordering analysis as
//! top-level ones. Two paths where one contains the other (`addr` and
//! `addr.house`) count as the same node.

use crate::error::DependencyError;
use crate::transform::Transform;
use fuzz_core::{DescriptorSet, FieldDescriptor, FieldPath, ValueShape};

/// A target field computed from a source field through a transform.
#[derive(Debug, Clone)]
pub struct Dependency {
    target: FieldPath,
    source: FieldPath,
    transform: Transform,
    target_field: FieldDescriptor,
    target_key: Vec<usize>,
}

impl Dependency {
    /// Path of the computed field.
    pub fn target(&self) -> &FieldPath {
        &self.target
    }

    /// Path of the field the value is computed from.
    pub fn source(&self) -> &FieldPath {
        &self.source
    }

    /// The transform applied to the source value.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Descriptor of the computed field.
    pub fn target_field(&self) -> &FieldDescriptor {
        &self.target_field
    }
}

/// The dependencies attached to one message fuzzer.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<Dependency>,
    /// Edge indices in evaluation order
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge `target <- transform(source)` for paths relative to
    /// `message`.
    ///
    /// The graph is unchanged when an error is returned.
    pub fn add(
        &mut self,
        schema: &DescriptorSet,
        message: &str,
        target: &str,
        source: &str,
        transform: Transform,
    ) -> Result<&Dependency, DependencyError> {
        let target_path = parse_path(message, target)?;
        let source_path = parse_path(message, source)?;

        let resolved_target = schema
            .resolve_path(message, &target_path)
            .map_err(|e| DependencyError::unknown_field(message, target, e))?;
        let resolved_source = schema
            .resolve_path(message, &source_path)
            .map_err(|e| DependencyError::unknown_field(message, source, e))?;

        if let Some(existing) = self.edges.iter().find(|e| e.target.overlaps(&target_path)) {
            return Err(DependencyError::Duplicate {
                target: target_path,
                existing: existing.target.clone(),
            });
        }

        if let Some(chain) = self.find_cycle(&target_path, &source_path) {
            return Err(DependencyError::Cycle {
                target: target_path,
                from: source_path,
                chain,
            });
        }

        let source_shape = ValueShape::of_field(resolved_source.descriptor);
        if !transform.input_shape().accepts(source_shape) {
            return Err(DependencyError::IncompatibleTransform {
                transform: transform.name().to_string(),
                path: source_path,
                transform_shape: transform.input_shape(),
                field_shape: source_shape,
            });
        }

        let target_shape = ValueShape::of_field(resolved_target.descriptor);
        if !output_fits(transform.output_shape(), target_shape) {
            return Err(DependencyError::IncompatibleTransform {
                transform: transform.name().to_string(),
                path: target_path,
                transform_shape: transform.output_shape(),
                field_shape: target_shape,
            });
        }

        self.edges.push(Dependency {
            target: target_path,
            source: source_path,
            transform,
            target_field: resolved_target.descriptor.clone(),
            target_key: resolved_target.declaration_key,
        });
        self.order = self.compute_order();

        let index = self.edges.len() - 1;
        Ok(&self.edges[index])
    }

    /// Dependencies in an order where every source is final before it is
    /// read. Ties are broken by the declaration order of the targets.
    pub fn evaluation_order(&self) -> Vec<&Dependency> {
        self.order.iter().map(|&i| &self.edges[i]).collect()
    }

    /// Check whether `path` is computed by a dependency, either directly or
    /// as part of a computed ancestor.
    pub fn is_dependent(&self, path: &FieldPath) -> bool {
        self.edges.iter().any(|e| e.target.is_prefix_of(path))
    }

    /// Get the dependency computing exactly `target`.
    pub fn get(&self, target: &FieldPath) -> Option<&Dependency> {
        self.edges.iter().find(|e| &e.target == target)
    }

    /// Paths of all computed fields, in insertion order.
    pub fn targets(&self) -> impl Iterator<Item = &FieldPath> {
        self.edges.iter().map(|e| &e.target)
    }

    /// Iterate over dependencies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.edges.iter()
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if there are no dependencies.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Follow existing edges backwards from `source`. Reaching a node that
    /// overlaps `target` means the new edge closes a cycle; the returned
    /// chain starts at `target` and ends at the node that reaches it.
    fn find_cycle(&self, target: &FieldPath, source: &FieldPath) -> Option<Vec<FieldPath>> {
        let mut visited = vec![false; self.edges.len()];
        let mut stack = vec![vec![target.clone(), source.clone()]];

        while let Some(chain) = stack.pop() {
            let node = &chain[chain.len() - 1];
            if node.overlaps(target) {
                return Some(chain);
            }
            for (i, edge) in self.edges.iter().enumerate() {
                if !visited[i] && edge.target.overlaps(node) {
                    visited[i] = true;
                    let mut next = chain.clone();
                    next.push(edge.source.clone());
                    stack.push(next);
                }
            }
        }
        None
    }

    /// Kahn's algorithm: edge `j` precedes edge `i` when `j` writes a field
    /// that `i` reads.
    fn compute_order(&self) -> Vec<usize> {
        let n = self.edges.len();
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            let ready = (0..n)
                .filter(|&i| !placed[i])
                .filter(|&i| {
                    (0..n).all(|j| {
                        j == i || placed[j] || !self.edges[j].target.overlaps(&self.edges[i].source)
                    })
                })
                .min_by(|&a, &b| {
                    self.edges[a]
                        .target_key
                        .cmp(&self.edges[b].target_key)
                        .then(a.cmp(&b))
                });
            match ready {
                Some(i) => {
                    placed[i] = true;
                    order.push(i);
                }
                // Unreachable while cycles are rejected in `add`.
                None => {
                    order.extend((0..n).filter(|&i| !placed[i]));
                    break;
                }
            }
        }
        order
    }
}

fn parse_path(message: &str, path: &str) -> Result<FieldPath, DependencyError> {
    FieldPath::parse(path).map_err(|e| DependencyError::unknown_field(message, path, e))
}

/// Whether a transform producing `output` can feed a field of shape `field`.
///
/// Integer outputs may target enum fields; membership is checked per value.
fn output_fits(output: ValueShape, field: ValueShape) -> bool {
    output == ValueShape::Any
        || field.accepts(output)
        || (field == ValueShape::Enum && output == ValueShape::Integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformConfig;
    use fuzz_core::{FieldType, MessageDescriptor, ScalarKind};

    fn schema() -> DescriptorSet {
        DescriptorSet::new(vec![
            MessageDescriptor::new(
                "Address",
                vec![
                    FieldDescriptor::new("house", ScalarKind::Int32),
                    FieldDescriptor::new("street", ScalarKind::String),
                ],
            ),
            MessageDescriptor::new(
                "Other",
                vec![
                    FieldDescriptor::new("addr", FieldType::message("Address")),
                    FieldDescriptor::new("foo", ScalarKind::UInt32),
                    FieldDescriptor::new("bar", ScalarKind::Int64),
                    FieldDescriptor::new("name", ScalarKind::String),
                    FieldDescriptor::new(
                        "color",
                        FieldType::enumeration("Color", vec![0, 1]),
                    ),
                    FieldDescriptor::repeated("history", FieldType::message("Address")),
                ],
            ),
        ])
        .unwrap()
    }

    fn increment() -> Transform {
        Transform::new("increment", |x: i128| x + 1)
    }

    #[test]
    fn test_add_and_order() {
        let schema = schema();
        let mut graph = DependencyGraph::new();
        graph
            .add(&schema, "Other", "bar", "foo", increment())
            .unwrap();
        graph
            .add(&schema, "Other", "foo", "addr.house", increment())
            .unwrap();

        let order: Vec<String> = graph
            .evaluation_order()
            .iter()
            .map(|d| d.target().to_string())
            .collect();
        assert_eq!(order, vec!["foo", "bar"]);

        assert!(graph.is_dependent(&FieldPath::field("foo")));
        assert!(!graph.is_dependent(&FieldPath::field("addr")));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let schema = schema();
        let mut graph = DependencyGraph::new();
        graph
            .add(&schema, "Other", "bar", "addr.house", increment())
            .unwrap();
        graph
            .add(&schema, "Other", "foo", "addr.street", TransformConfig::Length.build())
            .unwrap();

        let order: Vec<String> = graph
            .evaluation_order()
            .iter()
            .map(|d| d.target().to_string())
            .collect();
        assert_eq!(order, vec!["foo", "bar"]);
    }

    #[test]
    fn test_nested_target_orders_before_reader() {
        let schema = schema();
        let mut graph = DependencyGraph::new();
        graph
            .add(&schema, "Other", "name", "addr", TransformConfig::ToString.build())
            .unwrap();
        graph
            .add(&schema, "Other", "addr.house", "bar", Transform::identity())
            .unwrap();

        let order: Vec<String> = graph
            .evaluation_order()
            .iter()
            .map(|d| d.target().to_string())
            .collect();
        assert_eq!(order, vec!["addr.house", "name"]);
        assert!(graph.is_dependent(&FieldPath::parse("addr.house").unwrap()));
        assert!(!graph.is_dependent(&FieldPath::parse("addr.street").unwrap()));
    }

    #[test]
    fn test_cycle_rejected() {
        let schema = schema();
        let mut graph = DependencyGraph::new();
        graph
            .add(&schema, "Other", "foo", "bar", Transform::identity())
            .unwrap();

        let err = graph
            .add(&schema, "Other", "bar", "foo", Transform::identity())
            .unwrap_err();
        match err {
            DependencyError::Cycle { chain, .. } => {
                let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
                assert_eq!(chain, vec!["bar", "foo", "bar"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.evaluation_order()[0].target().to_string(), "foo");
    }

    #[test]
    fn test_self_and_nested_cycles() {
        let schema = schema();
        let mut graph = DependencyGraph::new();

        let err = graph
            .add(&schema, "Other", "foo", "foo", Transform::identity())
            .unwrap_err();
        assert!(matches!(err, DependencyError::Cycle { .. }));

        let err = graph
            .add(&schema, "Other", "addr.house", "addr", Transform::identity())
            .unwrap_err();
        assert!(matches!(err, DependencyError::Cycle { .. }));

        graph
            .add(&schema, "Other", "foo", "addr.house", increment())
            .unwrap();
        let err = graph
            .add(&schema, "Other", "addr", "foo", Transform::identity())
            .unwrap_err();
        assert!(matches!(err, DependencyError::Cycle { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let schema = schema();
        let mut graph = DependencyGraph::new();
        graph
            .add(&schema, "Other", "foo", "bar", increment())
            .unwrap();

        let err = graph
            .add(&schema, "Other", "foo", "addr.house", increment())
            .unwrap_err();
        assert!(matches!(err, DependencyError::Duplicate { .. }));

        graph
            .add(&schema, "Other", "addr.house", "bar", Transform::identity())
            .unwrap();
        let err = graph
            .add(&schema, "Other", "addr", "bar", Transform::identity())
            .unwrap_err();
        assert!(matches!(err, DependencyError::Duplicate { .. }));
    }

    #[test]
    fn test_unknown_field() {
        let schema = schema();
        let mut graph = DependencyGraph::new();

        for (target, source) in [
            ("missing", "foo"),
            ("foo", "missing"),
            ("foo", "addr.missing"),
            ("foo", "bar.house"),
            ("foo", "history.house"),
            ("foo", "addr..house"),
        ] {
            let err = graph
                .add(&schema, "Other", target, source, Transform::identity())
                .unwrap_err();
            assert!(
                matches!(err, DependencyError::UnknownField { .. }),
                "{target} <- {source}: {err}"
            );
        }
        assert!(graph.is_empty());
    }

    #[test]
    fn test_incompatible_transform() {
        let schema = schema();
        let mut graph = DependencyGraph::new();

        let err = graph
            .add(&schema, "Other", "foo", "name", increment())
            .unwrap_err();
        assert!(matches!(
            err,
            DependencyError::IncompatibleTransform {
                field_shape: ValueShape::String,
                ..
            }
        ));

        let shout = Transform::new("shout", |s: String| s.to_uppercase());
        let err = graph
            .add(&schema, "Other", "foo", "name", shout)
            .unwrap_err();
        assert!(matches!(
            err,
            DependencyError::IncompatibleTransform {
                field_shape: ValueShape::Integer,
                ..
            }
        ));

        graph
            .add(&schema, "Other", "color", "bar", increment())
            .unwrap();
        assert_eq!(graph.len(), 1);
    }
}
