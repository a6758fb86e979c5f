//! Struct/union construction helpers (SPEC_FULL.md §4.4.4, "Construction").
//!
//! Most of the value↔host bridge (`validate`, `read_from`, `write_to`,
//! `to_primitive`, `from_primitive`, `to_wire`, `from_wire`) already lives on
//! `TypeSpec` itself and its variants in `crate::spec`, since every one of
//! those operations dispatches on the spec tree and needs no state beyond
//! it. What's left here is the one bridge operation that doesn't start from
//! a decoded `Value` at all: building a fresh struct from caller-supplied
//! field values, named or positional, filling in defaults and raising on
//! missing required fields.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::spec::StructTypeSpec;
use crate::value::{FieldValue, Name, StructValue, Value};

/// Builds a struct value from named fields. Fields absent from `named` take
/// their spec's default (deep-cloned so later mutation of one instance
/// can't leak into another); a required field with neither an explicit
/// value nor a default raises `MissingRequired`.
pub fn construct_named(spec: &StructTypeSpec, mut named: HashMap<Name, Value>) -> Result<Value> {
    let mut values = StructValue::new();
    for field in spec.fields() {
        match named.remove(&field.name) {
            Some(v) => {
                field.spec.validate(&v)?;
                values.push(FieldValue::new(field.id, field.spec.ttype(), v));
            }
            None => {
                if let Some(default) = &field.default {
                    values.push(FieldValue::new(field.id, field.spec.ttype(), default.clone()));
                } else if field.required {
                    return Err(Error::missing_required(format!(
                        "missing required field {} ({}) on {}",
                        field.name, field.id, spec.name
                    )));
                }
            }
        }
    }
    if let Some((stray, _)) = named.into_iter().next() {
        return Err(Error::type_mismatch(format!("{} has no field named {stray}", spec.name)));
    }
    Ok(Value::Struct(values))
}

/// Builds a struct value from positional arguments, ordered
/// required-without-default fields first, then every remaining field in
/// declaration order — the same order the teacher's generated constructors
/// present parameters in.
pub fn construct_positional(spec: &StructTypeSpec, positional: Vec<Value>) -> Result<Value> {
    let order = positional_field_order(spec);
    if positional.len() > order.len() {
        return Err(Error::type_mismatch(format!(
            "{} takes at most {} positional arguments, got {}",
            spec.name,
            order.len(),
            positional.len()
        )));
    }
    let mut named = HashMap::with_capacity(positional.len());
    for (field, value) in order.into_iter().zip(positional) {
        named.insert(field.name, value);
    }
    construct_named(spec, named)
}

/// `required-without-default` fields first (in declaration order), then
/// every other field (also in declaration order).
fn positional_field_order(spec: &StructTypeSpec) -> Vec<crate::spec::FieldSpec> {
    let fields = spec.fields();
    let (required_first, rest): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .partition(|f| f.required && f.default.is_none());
    required_first.into_iter().chain(rest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{PrimitiveTypeSpec, StructKind};
    use crate::spec::struct_spec::FieldSpec;

    fn person_spec() -> std::rc::Rc<StructTypeSpec> {
        let spec = StructTypeSpec::new(
            "Person",
            StructKind::Plain,
            vec![
                FieldSpec::new(1, "name", PrimitiveTypeSpec::string(), true, None),
                FieldSpec::new(
                    2,
                    "age",
                    PrimitiveTypeSpec::i32(),
                    false,
                    Some(Value::I32(0)),
                ),
            ],
        )
        .unwrap();
        match spec {
            crate::spec::TypeSpec::Struct(s) => s,
            _ => unreachable!(),
        }
    }

    #[test]
    fn named_construction_fills_defaults() {
        let spec = person_spec();
        let mut named = HashMap::new();
        named.insert(Name::new("name"), Value::Binary(b"Ada".to_vec()));
        let v = construct_named(&spec, named).unwrap();
        let s = v.as_struct().unwrap();
        assert_eq!(s.field_by_id(2).unwrap().value, Value::I32(0));
    }

    #[test]
    fn named_construction_requires_required_field() {
        let spec = person_spec();
        let err = construct_named(&spec, HashMap::new()).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::MissingRequired));
    }

    #[test]
    fn positional_construction_orders_required_without_default_first() {
        let spec = person_spec();
        let v = construct_positional(&spec, vec![Value::Binary(b"Grace".to_vec())]).unwrap();
        let s = v.as_struct().unwrap();
        assert_eq!(s.field_by_id(1).unwrap().value, Value::Binary(b"Grace".to_vec()));
        assert_eq!(s.field_by_id(2).unwrap().value, Value::I32(0));
    }
}
