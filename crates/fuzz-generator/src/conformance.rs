//! Checks that a value satisfies a field's declared type.
//!
//! Conforming integers are normalised to the signedness of the field kind:
//! `Int` for signed kinds and `UInt` for unsigned ones. A message value
//! conforms when it has every declared field of its type, in declaration
//! order, each conforming in turn.

use fuzz_core::{
    DescriptorSet, FieldDescriptor, FieldType, FuzzValue, ResolvedInstance, ScalarKind,
};

/// Conform `value` to `field`, returning the normalised value or `None` if
/// the value does not fit the field.
pub fn conform(
    schema: &DescriptorSet,
    field: &FieldDescriptor,
    value: &FuzzValue,
) -> Option<FuzzValue> {
    if field.is_repeated() {
        let items = value.as_list()?;
        return items
            .iter()
            .map(|item| conform_single(schema, &field.field_type, item))
            .collect::<Option<Vec<_>>>()
            .map(FuzzValue::List);
    }
    conform_single(schema, &field.field_type, value)
}

/// Human-readable description of what a field accepts.
pub fn describe(field: &FieldDescriptor) -> String {
    if field.is_repeated() {
        format!("repeated {}", field.field_type)
    } else {
        field.field_type.to_string()
    }
}

fn conform_single(
    schema: &DescriptorSet,
    field_type: &FieldType,
    value: &FuzzValue,
) -> Option<FuzzValue> {
    match (field_type, value) {
        (FieldType::Message { name }, FuzzValue::Message(instance)) => {
            conform_message(schema, name, instance).map(FuzzValue::Message)
        }
        (FieldType::Message { .. }, _) => None,
        _ => conform_scalar(field_type, value),
    }
}

fn conform_message(
    schema: &DescriptorSet,
    name: &str,
    instance: &ResolvedInstance,
) -> Option<ResolvedInstance> {
    let descriptor = schema.get_message(name)?;
    if instance.message_type() != name || instance.len() != descriptor.fields.len() {
        return None;
    }
    let mut conformed = ResolvedInstance::new(name);
    for (field, (field_name, value)) in descriptor.fields.iter().zip(instance.fields()) {
        if field.name != field_name {
            return None;
        }
        conformed.push(field_name, conform(schema, field, value)?);
    }
    Some(conformed)
}

/// Conform a value to a scalar or enum type. Message types never conform
/// here; they need the schema.
pub(crate) fn conform_scalar(field_type: &FieldType, value: &FuzzValue) -> Option<FuzzValue> {
    match field_type {
        FieldType::Scalar(kind) if kind.is_integer() => match value {
            FuzzValue::Int(_) | FuzzValue::UInt(_) => integer_value(*kind, value.as_i128()?),
            _ => None,
        },
        FieldType::Scalar(ScalarKind::Float) => match value {
            FuzzValue::Float(f) if !f.is_finite() || (*f as f32).is_finite() => {
                Some(value.clone())
            }
            _ => None,
        },
        FieldType::Scalar(ScalarKind::Double) => value.as_f64().map(FuzzValue::Float),
        FieldType::Scalar(ScalarKind::Bool) => value.as_bool().map(FuzzValue::Bool),
        FieldType::Scalar(ScalarKind::String) => {
            value.as_str().map(|s| FuzzValue::String(s.to_string()))
        }
        FieldType::Scalar(_) => value.as_bytes().map(|b| FuzzValue::Bytes(b.to_vec())),
        FieldType::Enum { values, .. } => {
            let number = match value {
                FuzzValue::Enum(_) | FuzzValue::Int(_) | FuzzValue::UInt(_) => {
                    i32::try_from(value.as_i128()?).ok()?
                }
                _ => return None,
            };
            values.contains(&number).then_some(FuzzValue::Enum(number))
        }
        FieldType::Message { .. } => None,
    }
}

/// Wrap an integer as a value of an integer kind, or `None` if it does not
/// fit the kind's width and signedness.
pub(crate) fn integer_value(kind: ScalarKind, value: i128) -> Option<FuzzValue> {
    let (_, signed) = kind.integer_width()?;
    if !kind.fits(value) {
        return None;
    }
    if signed {
        i64::try_from(value).ok().map(FuzzValue::Int)
    } else {
        u64::try_from(value).ok().map(FuzzValue::UInt)
    }
}
