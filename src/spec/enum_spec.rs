//! `EnumTypeSpec`: on-wire I32, with a name<->value mapping.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as Primitive;

use crate::error::{Error, Result};
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::spec::TypeSpec;
use crate::value::{Name, Value};

pub struct EnumTypeSpec {
    pub name: Name,
    items: Vec<(Name, i32)>,
    by_value: HashMap<i32, Vec<Name>>,
    by_name: HashMap<Name, i32>,
    /// When set, `to_primitive` emits the canonical item name instead of the
    /// integer (SPEC_FULL.md §9, open question (b)). `from_primitive` always
    /// accepts either form regardless of this flag.
    pub primitive_as_name: bool,
}

impl EnumTypeSpec {
    pub fn new(name: impl Into<Name>, items: Vec<(Name, i32)>) -> Result<TypeSpec> {
        Self::with_primitive_as_name(name, items, false)
    }

    pub fn with_primitive_as_name(
        name: impl Into<Name>,
        items: Vec<(Name, i32)>,
        primitive_as_name: bool,
    ) -> Result<TypeSpec> {
        let mut by_value: HashMap<i32, Vec<Name>> = HashMap::new();
        let mut by_name: HashMap<Name, i32> = HashMap::new();
        for (item_name, value) in &items {
            if by_name.contains_key(item_name) {
                return Err(Error::compile(
                    format!("duplicate enum item name {item_name}"),
                    None,
                ));
            }
            by_name.insert(item_name.clone(), *value);
            by_value.entry(*value).or_default().push(item_name.clone());
        }
        Ok(TypeSpec::Enum(Rc::new(EnumTypeSpec {
            name: name.into(),
            items,
            by_value,
            by_name,
            primitive_as_name,
        })))
    }

    pub fn items(&self) -> &[(Name, i32)] {
        &self.items
    }

    /// First-declared name for a given value, or `None` if the value was
    /// never declared.
    pub fn name_of(&self, value: i32) -> Option<&Name> {
        self.by_value.get(&value).and_then(|names| names.first())
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        Ok(Value::I32(reader.read_i32()?))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let v = self.as_i32(value)?;
        writer.write_i32(v)
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        self.as_i32(value).map(|_| ())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let v = self.as_i32(value)?;
        if self.primitive_as_name {
            if let Some(name) = self.name_of(v) {
                return Ok(Primitive::String(name.to_string()));
            }
        }
        Ok(Primitive::Number(v.into()))
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        if let Some(n) = primitive.as_i64() {
            return Ok(Value::I32(n.try_into().map_err(|_| {
                Error::out_of_range(format!("{n} does not fit in an i32"))
            })?));
        }
        if let Some(s) = primitive.as_str() {
            return self
                .value_of(s)
                .map(Value::I32)
                .ok_or_else(|| Error::type_mismatch(format!("unknown enum item {s} for {}", self.name)));
        }
        Err(Error::type_mismatch(format!(
            "expected an integer or item name for enum {}",
            self.name
        )))
    }

    fn as_i32(&self, value: &Value) -> Result<i32> {
        match value {
            Value::I32(v) => Ok(*v),
            _ => Err(Error::type_mismatch(format!("expected an i32 value for enum {}", self.name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> std::rc::Rc<EnumTypeSpec> {
        match EnumTypeSpec::new("Color", vec![(Name::new("Red"), 0), (Name::new("Green"), 1)]).unwrap() {
            TypeSpec::Enum(e) => e,
            _ => unreachable!(),
        }
    }

    #[test]
    fn name_of_returns_the_first_declared_name_for_a_value() {
        let e = color();
        assert_eq!(e.name_of(0), Some(&Name::new("Red")));
        assert_eq!(e.name_of(99), None);
    }

    #[test]
    fn from_primitive_accepts_either_an_integer_or_an_item_name() {
        let e = color();
        assert_eq!(e.from_primitive(&Primitive::from(1)).unwrap(), Value::I32(1));
        assert_eq!(e.from_primitive(&Primitive::String("Green".into())).unwrap(), Value::I32(1));
        assert!(e.from_primitive(&Primitive::String("Purple".into())).is_err());
    }

    #[test]
    fn to_primitive_emits_the_name_only_when_configured() {
        let numeric = color();
        assert_eq!(numeric.to_primitive(&Value::I32(1)).unwrap(), Primitive::from(1));

        let named = match EnumTypeSpec::with_primitive_as_name(
            "Color",
            vec![(Name::new("Red"), 0), (Name::new("Green"), 1)],
            true,
        )
        .unwrap()
        {
            TypeSpec::Enum(e) => e,
            _ => unreachable!(),
        };
        assert_eq!(named.to_primitive(&Value::I32(1)).unwrap(), Primitive::String("Green".into()));
    }
}
