//! List/set/map specs: thin wrappers parameterized by child specs.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as Primitive};

use crate::error::{Error, Result};
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::scope::Scope;
use crate::spec::TypeSpec;
use crate::ttype::TType;
use crate::value::{ListValue, MapValue, Name, SetValue, Value};

pub struct ListTypeSpec {
    elem: RefCell<TypeSpec>,
    linked: RefCell<bool>,
}

impl ListTypeSpec {
    pub fn new(elem: TypeSpec) -> TypeSpec {
        TypeSpec::List(Rc::new(ListTypeSpec {
            elem: RefCell::new(elem),
            linked: RefCell::new(false),
        }))
    }

    pub fn elem(&self) -> TypeSpec {
        self.elem.borrow().clone()
    }

    pub fn name(&self) -> Name {
        Name::new(format!("list<{}>", self.elem().name()))
    }

    pub fn link(self: &Rc<Self>, scope: &Scope) -> Result<TypeSpec> {
        if !*self.linked.borrow() {
            *self.linked.borrow_mut() = true;
            let linked_elem = self.elem().link(scope)?;
            *self.elem.borrow_mut() = linked_elem;
        }
        Ok(TypeSpec::List(self.clone()))
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        let header = reader.read_list_begin()?;
        let elem = self.elem();
        let mut values = Vec::with_capacity(header.size);
        for _ in 0..header.size {
            values.push(elem.read_from(reader)?);
        }
        reader.read_list_end()?;
        Ok(Value::List(ListValue {
            elem_ttype: header.element_type,
            values,
        }))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let list = value
            .as_list()
            .ok_or_else(|| Error::type_mismatch("expected a list value"))?;
        let elem = self.elem();
        writer.write_list_begin(&crate::protocol::TListIdentifier::new(
            elem.ttype(),
            list.values.len(),
        ))?;
        for v in &list.values {
            elem.write_to(writer, v)?;
        }
        writer.write_list_end()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let list = value
            .as_list()
            .ok_or_else(|| Error::type_mismatch("expected a list value"))?;
        let elem = self.elem();
        for v in &list.values {
            elem.validate(v)?;
        }
        Ok(())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let list = value
            .as_list()
            .ok_or_else(|| Error::type_mismatch("expected a list value"))?;
        let elem = self.elem();
        Ok(Primitive::Array(
            list.values
                .iter()
                .map(|v| elem.to_primitive(v))
                .collect::<Result<Vec<_>>>()?,
        ))
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        let items = primitive
            .as_array()
            .ok_or_else(|| Error::type_mismatch("expected a JSON array"))?;
        let elem = self.elem();
        let values = items
            .iter()
            .map(|item| elem.from_primitive(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::List(ListValue {
            elem_ttype: elem.ttype(),
            values,
        }))
    }
}

pub struct SetTypeSpec {
    elem: RefCell<TypeSpec>,
    linked: RefCell<bool>,
}

impl SetTypeSpec {
    pub fn new(elem: TypeSpec) -> TypeSpec {
        TypeSpec::Set(Rc::new(SetTypeSpec {
            elem: RefCell::new(elem),
            linked: RefCell::new(false),
        }))
    }

    pub fn elem(&self) -> TypeSpec {
        self.elem.borrow().clone()
    }

    pub fn name(&self) -> Name {
        Name::new(format!("set<{}>", self.elem().name()))
    }

    pub fn link(self: &Rc<Self>, scope: &Scope) -> Result<TypeSpec> {
        if !*self.linked.borrow() {
            *self.linked.borrow_mut() = true;
            let linked_elem = self.elem().link(scope)?;
            *self.elem.borrow_mut() = linked_elem;
        }
        Ok(TypeSpec::Set(self.clone()))
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        let header = reader.read_set_begin()?;
        let elem = self.elem();
        let mut values: Vec<Value> = Vec::with_capacity(header.size);
        let mut seen: HashSet<String> = HashSet::with_capacity(header.size);
        for _ in 0..header.size {
            let v = elem.read_from(reader)?;
            if seen.insert(format!("{v:?}")) {
                values.push(v);
            }
        }
        reader.read_set_end()?;
        Ok(Value::Set(SetValue {
            elem_ttype: header.element_type,
            values,
        }))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let set = value
            .as_set()
            .ok_or_else(|| Error::type_mismatch("expected a set value"))?;
        let elem = self.elem();
        writer.write_set_begin(&crate::protocol::TSetIdentifier::new(
            elem.ttype(),
            set.values.len(),
        ))?;
        for v in &set.values {
            elem.write_to(writer, v)?;
        }
        writer.write_set_end()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let set = value
            .as_set()
            .ok_or_else(|| Error::type_mismatch("expected a set value"))?;
        let elem = self.elem();
        for v in &set.values {
            elem.validate(v)?;
        }
        Ok(())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let set = value
            .as_set()
            .ok_or_else(|| Error::type_mismatch("expected a set value"))?;
        let elem = self.elem();
        Ok(Primitive::Array(
            set.values
                .iter()
                .map(|v| elem.to_primitive(v))
                .collect::<Result<Vec<_>>>()?,
        ))
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        let items = primitive
            .as_array()
            .ok_or_else(|| Error::type_mismatch("expected a JSON array"))?;
        let elem = self.elem();
        let mut values = Vec::with_capacity(items.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
        for item in items {
            let v = elem.from_primitive(item)?;
            if seen.insert(format!("{v:?}")) {
                values.push(v);
            }
        }
        Ok(Value::Set(SetValue {
            elem_ttype: elem.ttype(),
            values,
        }))
    }
}

pub struct MapTypeSpec {
    key: RefCell<TypeSpec>,
    val: RefCell<TypeSpec>,
    linked: RefCell<bool>,
}

impl MapTypeSpec {
    pub fn new(key: TypeSpec, val: TypeSpec) -> TypeSpec {
        TypeSpec::Map(Rc::new(MapTypeSpec {
            key: RefCell::new(key),
            val: RefCell::new(val),
            linked: RefCell::new(false),
        }))
    }

    pub fn key(&self) -> TypeSpec {
        self.key.borrow().clone()
    }

    pub fn val(&self) -> TypeSpec {
        self.val.borrow().clone()
    }

    pub fn name(&self) -> Name {
        Name::new(format!("map<{},{}>", self.key().name(), self.val().name()))
    }

    pub fn link(self: &Rc<Self>, scope: &Scope) -> Result<TypeSpec> {
        if !*self.linked.borrow() {
            *self.linked.borrow_mut() = true;
            let linked_key = self.key().link(scope)?;
            let linked_val = self.val().link(scope)?;
            *self.key.borrow_mut() = linked_key;
            *self.val.borrow_mut() = linked_val;
        }
        Ok(TypeSpec::Map(self.clone()))
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        let header = reader.read_map_begin()?;
        let (key, val) = (self.key(), self.val());
        let mut pairs = Vec::with_capacity(header.size);
        for _ in 0..header.size {
            let k = key.read_from(reader)?;
            let v = val.read_from(reader)?;
            pairs.push((k, v));
        }
        reader.read_map_end()?;
        Ok(Value::Map(MapValue {
            key_ttype: header.key_type,
            val_ttype: header.value_type,
            pairs,
        }))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let map = value
            .as_map()
            .ok_or_else(|| Error::type_mismatch("expected a map value"))?;
        let (key, val) = (self.key(), self.val());
        writer.write_map_begin(&crate::protocol::TMapIdentifier::new(
            key.ttype(),
            val.ttype(),
            map.pairs.len(),
        ))?;
        for (k, v) in &map.pairs {
            key.write_to(writer, k)?;
            val.write_to(writer, v)?;
        }
        writer.write_map_end()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let map = value
            .as_map()
            .ok_or_else(|| Error::type_mismatch("expected a map value"))?;
        let (key, val) = (self.key(), self.val());
        for (k, v) in &map.pairs {
            key.validate(k)?;
            val.validate(v)?;
        }
        Ok(())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let map = value
            .as_map()
            .ok_or_else(|| Error::type_mismatch("expected a map value"))?;
        let (key, val) = (self.key(), self.val());
        let mut obj = JsonMap::with_capacity(map.pairs.len());
        for (k, v) in &map.pairs {
            let key_str = primitive_to_object_key(&key.to_primitive(k)?)?;
            obj.insert(key_str, val.to_primitive(v)?);
        }
        Ok(Primitive::Object(obj))
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        let obj = primitive
            .as_object()
            .ok_or_else(|| Error::type_mismatch("expected a JSON object"))?;
        let (key, val) = (self.key(), self.val());
        let mut pairs = Vec::with_capacity(obj.len());
        for (k, v) in obj {
            let key_primitive = Primitive::String(k.clone());
            pairs.push((key.from_primitive(&key_primitive)?, val.from_primitive(v)?));
        }
        Ok(Value::Map(MapValue {
            key_ttype: key.ttype(),
            val_ttype: val.ttype(),
            pairs,
        }))
    }
}

/// JSON object keys must be strings; a non-text map key (e.g. i32) is
/// rendered as its decimal/boolean text form.
fn primitive_to_object_key(p: &Primitive) -> Result<String> {
    Ok(match p {
        Primitive::String(s) => s.clone(),
        Primitive::Number(n) => n.to_string(),
        Primitive::Bool(b) => b.to_string(),
        _ => return Err(Error::type_mismatch("map key does not have a textual primitive form")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{TBinaryInputProtocol, TBinaryOutputProtocol};
    use crate::spec::PrimitiveTypeSpec;

    #[test]
    fn list_of_i32_round_trips() {
        let spec = match ListTypeSpec::new(PrimitiveTypeSpec::i32()) {
            TypeSpec::List(l) => l,
            _ => unreachable!(),
        };
        let value = Value::List(ListValue {
            elem_ttype: TType::I32,
            values: vec![Value::I32(1), Value::I32(2), Value::I32(3)],
        });
        let mut out = TBinaryOutputProtocol::new();
        spec.write_to(&mut out, &value).unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        let decoded = spec.read_from(&mut input).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn set_deduplicates_on_read() {
        let spec = match SetTypeSpec::new(PrimitiveTypeSpec::i32()) {
            TypeSpec::Set(s) => s,
            _ => unreachable!(),
        };
        let mut out = TBinaryOutputProtocol::new();
        out.write_set_begin(&crate::protocol::TSetIdentifier::new(TType::I32, 3))
            .unwrap();
        out.write_i32(1).unwrap();
        out.write_i32(1).unwrap();
        out.write_i32(2).unwrap();
        out.write_set_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        let decoded = spec.read_from(&mut input).unwrap();
        let set = decoded.as_set().unwrap();
        assert_eq!(set.values, vec![Value::I32(1), Value::I32(2)]);
    }

    #[test]
    fn map_to_primitive_renders_non_text_keys_as_strings() {
        let spec = match MapTypeSpec::new(PrimitiveTypeSpec::i32(), PrimitiveTypeSpec::string()) {
            TypeSpec::Map(m) => m,
            _ => unreachable!(),
        };
        let value = Value::Map(MapValue {
            key_ttype: TType::I32,
            val_ttype: TType::Binary,
            pairs: vec![(Value::I32(7), Value::Binary(b"seven".to_vec()))],
        });
        let primitive = spec.to_primitive(&value).unwrap();
        assert_eq!(primitive, serde_json::json!({ "7": "seven" }));
    }

    #[test]
    fn map_from_primitive_round_trips() {
        let spec = match MapTypeSpec::new(PrimitiveTypeSpec::string(), PrimitiveTypeSpec::i32()) {
            TypeSpec::Map(m) => m,
            _ => unreachable!(),
        };
        let primitive = serde_json::json!({ "a": 1, "b": 2 });
        let value = spec.from_primitive(&primitive).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.pairs.len(), 2);
    }
}
