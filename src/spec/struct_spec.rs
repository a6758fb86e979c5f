//! `StructTypeSpec` and the `FieldSpec`s it's built from. Unions
//! (`crate::spec::union_spec`) share the same `FieldSpec` shape and wire
//! framing, differing only in cardinality rules.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as Primitive};

use crate::error::{Error, Result};
use crate::protocol::{TFieldIdentifier, TInputProtocol, TOutputProtocol};
use crate::scope::Scope;
use crate::spec::{StructKind, TypeSpec};
use crate::value::{FieldValue, Name, StructValue, Value};

#[derive(Clone)]
pub struct FieldSpec {
    pub id: i16,
    pub name: Name,
    pub spec: TypeSpec,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(id: i16, name: impl Into<Name>, spec: TypeSpec, required: bool, default: Option<Value>) -> Self {
        FieldSpec {
            id,
            name: name.into(),
            spec,
            required,
            default,
        }
    }
}

pub struct StructTypeSpec {
    pub name: Name,
    pub kind: StructKind,
    fields: RefCell<Vec<FieldSpec>>,
    index: RefCell<HashMap<i16, usize>>,
    linked: RefCell<bool>,
}

impl StructTypeSpec {
    pub fn new(name: impl Into<Name>, kind: StructKind, fields: Vec<FieldSpec>) -> Result<TypeSpec> {
        let mut index = HashMap::with_capacity(fields.len());
        let mut seen_names = HashMap::new();
        for (i, f) in fields.iter().enumerate() {
            if index.insert(f.id, i).is_some() {
                return Err(Error::compile(format!("duplicate field id {} in struct", f.id), None));
            }
            if seen_names.insert(f.name.clone(), ()).is_some() {
                return Err(Error::compile(format!("duplicate field name {} in struct", f.name), None));
            }
        }
        Ok(TypeSpec::Struct(Rc::new(StructTypeSpec {
            name: name.into(),
            kind,
            fields: RefCell::new(fields),
            index: RefCell::new(index),
            linked: RefCell::new(false),
        })))
    }

    pub fn fields(&self) -> Vec<FieldSpec> {
        self.fields.borrow().clone()
    }

    pub fn field_by_id(&self, id: i16) -> Option<FieldSpec> {
        let index = self.index.borrow();
        index.get(&id).map(|&i| self.fields.borrow()[i].clone())
    }

    pub fn field_by_name(&self, name: &str) -> Option<FieldSpec> {
        self.fields.borrow().iter().find(|f| f.name == name).cloned()
    }

    /// Fills in a field's default value once the IDL's literal default
    /// expression has been converted against the field's (now-linked) spec.
    /// Called by the linker's third pass (`Scope::resolve_pending_defaults`).
    pub fn set_default(&self, id: i16, default: Value) {
        if let Some(mut f) = self.field_by_id(id) {
            f.default = Some(default);
            let mut fields = self.fields.borrow_mut();
            if let Some(&i) = self.index.borrow().get(&id) {
                fields[i] = f;
            }
        }
    }

    pub fn link(self: &Rc<Self>, scope: &Scope) -> Result<TypeSpec> {
        if !*self.linked.borrow() {
            *self.linked.borrow_mut() = true;
            let mut fields = self.fields.borrow_mut();
            for f in fields.iter_mut() {
                f.spec = f.spec.link(scope)?;
            }
        }
        Ok(TypeSpec::Struct(self.clone()))
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        reader.read_struct_begin()?;
        let mut values = StructValue::new();
        loop {
            let header = reader.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            let id = header.id.expect("non-stop field header always carries an id");
            match self.field_by_id(id) {
                Some(field) if field.spec.ttype() == header.field_type => {
                    let v = field.spec.read_from(reader)?;
                    values.push(FieldValue::new(id, header.field_type, v));
                }
                _ => reader.skip(header.field_type)?,
            }
            reader.read_field_end()?;
        }
        reader.read_struct_end()?;
        self.apply_defaults(&mut values)?;
        self.check_required(&values)?;
        Ok(Value::Struct(values))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a struct value for {}", self.name)))?;
        writer.write_struct_begin()?;
        for field in self.fields().iter() {
            let Some(fv) = s.field_by_id(field.id) else {
                continue;
            };
            writer.write_field_begin(&TFieldIdentifier::new(field.spec.ttype(), Some(field.id)))?;
            field.spec.write_to(writer, &fv.value)?;
            writer.write_field_end()?;
        }
        writer.write_field_stop()?;
        writer.write_struct_end()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a struct value for {}", self.name)))?;
        self.check_required(s)?;
        for fv in s.fields() {
            if let Some(field) = self.field_by_id(fv.id) {
                field.spec.validate(&fv.value)?;
            }
        }
        Ok(())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a struct value for {}", self.name)))?;
        let mut obj = JsonMap::with_capacity(s.len());
        for field in self.fields() {
            if let Some(fv) = s.field_by_id(field.id) {
                obj.insert(field.name.to_string(), field.spec.to_primitive(&fv.value)?);
            }
        }
        Ok(Primitive::Object(obj))
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        let obj = primitive
            .as_object()
            .ok_or_else(|| Error::type_mismatch(format!("expected a JSON object for {}", self.name)))?;
        let mut values = StructValue::new();
        for field in self.fields() {
            match obj.get(field.name.as_str()) {
                Some(p) => {
                    let v = field.spec.from_primitive(p)?;
                    values.push(FieldValue::new(field.id, field.spec.ttype(), v));
                }
                None => {
                    if let Some(default) = &field.default {
                        values.push(FieldValue::new(field.id, field.spec.ttype(), default.clone()));
                    }
                }
            }
        }
        self.check_required(&values)?;
        Ok(Value::Struct(values))
    }

    fn apply_defaults(&self, values: &mut StructValue) -> Result<()> {
        for field in self.fields() {
            if values.field_by_id(field.id).is_none() {
                if let Some(default) = &field.default {
                    values.push(FieldValue::new(field.id, field.spec.ttype(), default.clone()));
                }
            }
        }
        Ok(())
    }

    fn check_required(&self, values: &StructValue) -> Result<()> {
        for field in self.fields() {
            if field.required && values.field_by_id(field.id).is_none() {
                return Err(Error::missing_required(format!(
                    "missing required field {} ({}) on {}",
                    field.name, field.id, self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{TBinaryInputProtocol, TBinaryOutputProtocol};
    use crate::error::ErrorKind;
    use crate::spec::PrimitiveTypeSpec;
    use crate::ttype::TType;

    fn person() -> Rc<StructTypeSpec> {
        match StructTypeSpec::new(
            "Person",
            StructKind::Plain,
            vec![
                FieldSpec::new(1, "name", PrimitiveTypeSpec::string(), true, None),
                FieldSpec::new(2, "age", PrimitiveTypeSpec::i32(), false, Some(Value::I32(0))),
            ],
        )
        .unwrap()
        {
            TypeSpec::Struct(s) => s,
            _ => unreachable!(),
        }
    }

    #[test]
    fn rejects_duplicate_field_ids() {
        let err = StructTypeSpec::new(
            "Bad",
            StructKind::Plain,
            vec![
                FieldSpec::new(1, "a", PrimitiveTypeSpec::i32(), false, None),
                FieldSpec::new(1, "b", PrimitiveTypeSpec::i32(), false, None),
            ],
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(_)));
    }

    #[test]
    fn write_then_read_round_trips_and_applies_defaults() {
        let spec = person();
        let mut values = StructValue::new();
        values.push(FieldValue::new(1, TType::Binary, Value::Binary(b"Ada".to_vec())));
        let value = Value::Struct(values);

        let mut out = TBinaryOutputProtocol::new();
        spec.write_to(&mut out, &value).unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        let decoded = spec.read_from(&mut input).unwrap();
        let s = decoded.as_struct().unwrap();
        assert_eq!(s.field_by_id(1).unwrap().value, Value::Binary(b"Ada".to_vec()));
        assert_eq!(s.field_by_id(2).unwrap().value, Value::I32(0));
    }

    #[test]
    fn read_from_raises_missing_required() {
        let spec = person();
        let mut out = TBinaryOutputProtocol::new();
        out.write_struct_begin().unwrap();
        out.write_field_stop().unwrap();
        out.write_struct_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        let err = spec.read_from(&mut input).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingRequired));
    }

    #[test]
    fn to_primitive_and_back_round_trips() {
        let spec = person();
        let mut values = StructValue::new();
        values.push(FieldValue::new(1, TType::Binary, Value::Binary(b"Grace".to_vec())));
        values.push(FieldValue::new(2, TType::I32, Value::I32(30)));
        let value = Value::Struct(values);

        let primitive = spec.to_primitive(&value).unwrap();
        let back = spec.from_primitive(&primitive).unwrap();
        let s = back.as_struct().unwrap();
        assert_eq!(s.field_by_id(1).unwrap().value, Value::Binary(b"Grace".to_vec()));
        assert_eq!(s.field_by_id(2).unwrap().value, Value::I32(30));
    }

    #[test]
    fn set_default_is_visible_through_field_by_id() {
        let spec = person();
        spec.set_default(2, Value::I32(99));
        assert_eq!(spec.field_by_id(2).unwrap().default, Some(Value::I32(99)));
    }
}
