//! Typed transforms that compute a dependent field from its source field.
//!
//! A [`Transform`] declares the value shape it consumes and the shape it
//! produces, so `add_dependency` can reject a transform that can never fit
//! the fields it connects. Transforms built from a typed closure get their
//! shapes from the closure signature:
//!
//! ```rust
//! use fuzz_generator::Transform;
//!
//! let increment = Transform::new("increment", |x: i128| x + 1);
//! assert_eq!(increment.input_shape().to_string(), "integer");
//! ```
//!
//! # YAML Format
//!
//! Configured dependencies name a built-in transform:
//!
//! ```yaml
//! transform:
//!   type: add
//!   amount: 1
//! ```

use fuzz_core::{FromFuzzValue, FuzzValue, IntoFuzzValue, ValueShape};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use std::fmt;
use std::sync::Arc;

type TransformFn = dyn Fn(&FuzzValue) -> Option<FuzzValue> + Send + Sync;

/// A pure function from a source value to a target value.
#[derive(Clone)]
pub struct Transform {
    name: String,
    input: ValueShape,
    output: ValueShape,
    func: Arc<TransformFn>,
}

impl Transform {
    /// Create a transform from a typed closure.
    ///
    /// Source values that cannot be extracted as `I` are reported as
    /// conformance failures during enumeration.
    pub fn new<I, O, F>(name: impl Into<String>, f: F) -> Self
    where
        I: FromFuzzValue,
        O: IntoFuzzValue,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            input: I::SHAPE,
            output: O::SHAPE,
            func: Arc::new(move |value| I::from_fuzz_value(value).map(|v| f(v).into_fuzz_value())),
        }
    }

    /// Create a transform over raw values with explicitly declared shapes.
    ///
    /// Returning `None` marks the source value as unsupported.
    pub fn dynamic<F>(name: impl Into<String>, input: ValueShape, output: ValueShape, f: F) -> Self
    where
        F: Fn(&FuzzValue) -> Option<FuzzValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            input,
            output,
            func: Arc::new(f),
        }
    }

    /// A transform that copies the source value.
    pub fn identity() -> Self {
        Self::dynamic("identity", ValueShape::Any, ValueShape::Any, |v| {
            Some(v.clone())
        })
    }

    /// Transform name, used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the accepted source values.
    pub fn input_shape(&self) -> ValueShape {
        self.input
    }

    /// Shape of the produced values.
    pub fn output_shape(&self) -> ValueShape {
        self.output
    }

    /// Apply the transform. `None` means the source value was not accepted.
    pub fn apply(&self, value: &FuzzValue) -> Option<FuzzValue> {
        (self.func)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.input, self.output)
    }
}

/// Built-in transforms that can be named in configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Copy the source value
    #[default]
    Identity,

    /// Add a constant to an integer
    Add {
        /// Amount to add
        amount: i64,
    },

    /// Multiply an integer by a constant
    Multiply {
        /// Factor to multiply by
        factor: i64,
    },

    /// Negate an integer
    Negate,

    /// Length of a string, byte string or list
    Length,

    /// String rendering of a scalar value
    ToString,

    /// Ignore the source and produce a fixed value
    Constant {
        /// Value to produce
        value: YamlValue,
    },
}

impl TransformConfig {
    /// Build the configured transform.
    pub fn build(&self) -> Transform {
        match self {
            Self::Identity => Transform::identity(),

            Self::Add { amount } => {
                let amount = i128::from(*amount);
                Transform::new(format!("add({amount})"), move |x: i128| x + amount)
            }

            Self::Multiply { factor } => {
                let factor = i128::from(*factor);
                Transform::dynamic(
                    format!("multiply({factor})"),
                    ValueShape::Integer,
                    ValueShape::Integer,
                    move |value| {
                        let x = value.as_i128()?;
                        Some(
                            x.checked_mul(factor)
                                .map_or(FuzzValue::Null, IntoFuzzValue::into_fuzz_value),
                        )
                    },
                )
            }

            Self::Negate => Transform::new("negate", |x: i128| -x),

            Self::Length => Transform::dynamic(
                "length",
                ValueShape::Any,
                ValueShape::Integer,
                |value| {
                    let len = match value {
                        FuzzValue::String(s) => s.len(),
                        FuzzValue::Bytes(b) => b.len(),
                        FuzzValue::List(l) => l.len(),
                        _ => return None,
                    };
                    Some(FuzzValue::UInt(len as u64))
                },
            ),

            Self::ToString => Transform::dynamic(
                "to_string",
                ValueShape::Any,
                ValueShape::String,
                |value| {
                    let rendered = match value {
                        FuzzValue::String(s) => s.clone(),
                        FuzzValue::Bool(b) => b.to_string(),
                        FuzzValue::Int(i) => i.to_string(),
                        FuzzValue::UInt(u) => u.to_string(),
                        FuzzValue::Float(f) => f.to_string(),
                        FuzzValue::Enum(e) => e.to_string(),
                        FuzzValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
                        FuzzValue::Message(_) | FuzzValue::List(_) => value.to_json().to_string(),
                        FuzzValue::Null => return None,
                    };
                    Some(FuzzValue::String(rendered))
                },
            ),

            Self::Constant { value } => {
                let constant = yaml_to_fuzz_value(value);
                Transform::dynamic(
                    format!("constant({constant})"),
                    ValueShape::Any,
                    constant.shape(),
                    move |_| Some(constant.clone()),
                )
            }
        }
    }
}

/// Convert a YAML value to a fuzz value.
///
/// Mappings have no message type to attach to and become `Null`.
pub fn yaml_to_fuzz_value(yaml: &YamlValue) -> FuzzValue {
    match yaml {
        YamlValue::Null => FuzzValue::Null,
        YamlValue::Bool(b) => FuzzValue::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FuzzValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                FuzzValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                FuzzValue::Float(f)
            } else {
                FuzzValue::String(n.to_string())
            }
        }
        YamlValue::String(s) => FuzzValue::String(s.clone()),
        YamlValue::Sequence(items) => FuzzValue::List(items.iter().map(yaml_to_fuzz_value).collect()),
        YamlValue::Mapping(_) => FuzzValue::Null,
        YamlValue::Tagged(tagged) => yaml_to_fuzz_value(&tagged.value),
    }
}
