//! The protocol-independent representation of any Thrift value.
//!
//! `Value` doubles as both the "wire value" (§3.2) and the dynamic "host
//! value" the bridge (`crate::bridge`) and spec tree (`crate::spec`) operate
//! on — see SPEC_FULL.md §9 for why no separate generated-struct layer sits
//! underneath it in this core.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::ttype::TType;

/// Any decoded Thrift value. Carries no host-type knowledge beyond its own
/// shape — a `Value::I32` does not know it is meant to be an enum, for
/// example; that knowledge lives in the spec tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Double(f64),
    I16(i16),
    I32(i32),
    I64(i64),
    Binary(Vec<u8>),
    Struct(StructValue),
    Map(MapValue),
    Set(SetValue),
    List(ListValue),
}

impl Value {
    /// The on-wire type code of this value's variant.
    pub fn ttype(&self) -> TType {
        match self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::Double(_) => TType::Double,
            Value::I16(_) => TType::I16,
            Value::I32(_) => TType::I32,
            Value::I64(_) => TType::I64,
            Value::Binary(_) => TType::Binary,
            Value::Struct(_) => TType::Struct,
            Value::Map(_) => TType::Map,
            Value::Set(_) => TType::Set,
            Value::List(_) => TType::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetValue> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// One decoded struct/union field: its declared id, the ttype it was
/// actually encoded with, and its value.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldValue {
    pub id: i16,
    pub ttype: TType,
    pub value: Value,
}

impl FieldValue {
    pub fn new(id: i16, ttype: TType, value: Value) -> Self {
        FieldValue { id, ttype, value }
    }
}

/// A decoded struct or union. Fields are kept in encounter/declaration order;
/// `index` gives O(1) lookup by `(id, ttype)` per §3.2.
#[derive(Clone, Debug, Default)]
pub struct StructValue {
    fields: Vec<FieldValue>,
    index: HashMap<(i16, TType), usize>,
}

impl StructValue {
    pub fn new() -> Self {
        StructValue::default()
    }

    pub fn with_fields(fields: Vec<FieldValue>) -> Self {
        let mut s = StructValue::new();
        for f in fields {
            s.push(f);
        }
        s
    }

    pub fn push(&mut self, field: FieldValue) {
        let key = (field.id, field.ttype);
        let idx = self.fields.len();
        self.fields.push(field);
        self.index.insert(key, idx);
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// Look up a field by id, accepting any wire ttype it may have been
    /// encoded with. Returns the first stored match.
    pub fn field_by_id(&self, id: i16) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Look up a field by `(id, ttype)`, the O(1) path described in §3.2.
    pub fn field(&self, id: i16, ttype: TType) -> Option<&FieldValue> {
        self.index.get(&(id, ttype)).map(|&i| &self.fields[i])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

/// A decoded map: known key/value ttypes (from the wire header) plus an
/// ordered sequence of pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct MapValue {
    pub key_ttype: TType,
    pub val_ttype: TType,
    pub pairs: Vec<(Value, Value)>,
}

/// A decoded set: preserves encounter order; deduplication by host equality
/// happens at construction time (see `crate::bridge`), not here.
#[derive(Clone, Debug, PartialEq)]
pub struct SetValue {
    pub elem_ttype: TType,
    pub values: Vec<Value>,
}

/// A decoded list: order-preserving.
#[derive(Clone, Debug, PartialEq)]
pub struct ListValue {
    pub elem_ttype: TType,
    pub values: Vec<Value>,
}

/// A name, interned cheaply — used pervasively by the spec tree for type,
/// field, and service names.
pub type Name = SmolStr;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_value_indexes_by_id_and_ttype() {
        let mut s = StructValue::new();
        s.push(FieldValue::new(1, TType::I32, Value::I32(42)));
        s.push(FieldValue::new(2, TType::Binary, Value::Binary(b"hi".to_vec())));

        assert_eq!(s.field(1, TType::I32).unwrap().value, Value::I32(42));
        assert!(s.field(1, TType::I64).is_none());
        assert_eq!(s.field_by_id(2).unwrap().id, 2);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn value_ttype_matches_variant() {
        assert_eq!(Value::Bool(true).ttype(), TType::Bool);
        assert_eq!(Value::I64(1).ttype(), TType::I64);
        assert_eq!(
            Value::List(ListValue {
                elem_ttype: TType::I32,
                values: vec![]
            })
            .ttype(),
            TType::List
        );
    }
}
