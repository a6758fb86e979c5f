//! `UnionTypeSpec`: struct wire shape, stricter cardinality. Function results
//! (the implicit `<svc>_<fn>_response` union, see `crate::spec::function`)
//! are a union with `allow_empty` set for void-returning functions and an
//! exception-id set that triggers `Error::unknown_exception` on a stray id.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as Primitive};

use crate::error::{Error, Result};
use crate::protocol::{TFieldIdentifier, TInputProtocol, TOutputProtocol};
use crate::scope::Scope;
use crate::spec::{FieldSpec, TypeSpec};
use crate::value::{FieldValue, Name, StructValue, Value};

pub struct UnionTypeSpec {
    pub name: Name,
    fields: RefCell<Vec<FieldSpec>>,
    index: HashMap<i16, usize>,
    /// True for the synthesized response union of a `void` function, where
    /// zero fields present means "success, no value".
    pub allow_empty: bool,
    /// Field ids known to be declared exceptions, for `UnknownException`
    /// detection on function-result unions. Empty for ordinary unions.
    known_exception_ids: HashSet<i16>,
    /// Set only for the synthesized `<svc>_<fn>_response` union, which is
    /// the one shape SPEC_FULL.md §4.4.5 raises `UnknownException` for.
    /// Ordinary unions just skip fields they don't recognize, like structs.
    is_function_result: bool,
    linked: RefCell<bool>,
}

impl UnionTypeSpec {
    pub fn new(name: impl Into<Name>, fields: Vec<FieldSpec>, allow_empty: bool) -> Result<TypeSpec> {
        Self::build(name, fields, allow_empty, HashSet::new(), false)
    }

    pub fn with_exception_ids(
        name: impl Into<Name>,
        fields: Vec<FieldSpec>,
        allow_empty: bool,
        known_exception_ids: HashSet<i16>,
    ) -> Result<TypeSpec> {
        Self::build(name, fields, allow_empty, known_exception_ids, true)
    }

    fn build(
        name: impl Into<Name>,
        fields: Vec<FieldSpec>,
        allow_empty: bool,
        known_exception_ids: HashSet<i16>,
        is_function_result: bool,
    ) -> Result<TypeSpec> {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if index.insert(f.id, i).is_some() {
                return Err(Error::compile(format!("duplicate field id {} in union", f.id), None));
            }
        }
        Ok(TypeSpec::Union(Rc::new(UnionTypeSpec {
            name: name.into(),
            fields: RefCell::new(fields),
            index,
            allow_empty,
            known_exception_ids,
            is_function_result,
            linked: RefCell::new(false),
        })))
    }

    pub fn fields(&self) -> Vec<FieldSpec> {
        self.fields.borrow().clone()
    }

    pub fn field_by_id(&self, id: i16) -> Option<FieldSpec> {
        self.index.get(&id).map(|&i| self.fields.borrow()[i].clone())
    }

    /// See `StructTypeSpec::set_default` — unions carrying a default-valued
    /// field are rejected by the linker (SPEC_FULL.md §6.1), but function
    /// result unions reuse the same `FieldSpec` shape so the setter lives
    /// here too for symmetry.
    pub fn set_default(&self, id: i16, default: Value) {
        if let Some(&i) = self.index.get(&id) {
            let mut fields = self.fields.borrow_mut();
            fields[i].default = Some(default);
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
        Ok(TypeSpec::Union(self.clone()))
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
                _ if self.is_function_result && id != 0 && !self.known_exception_ids.contains(&id) => {
                    reader.skip(header.field_type)?;
                    reader.read_field_end()?;
                    reader.read_struct_end()?;
                    return Err(Error::unknown_exception(Value::I32(id as i32)));
                }
                _ => reader.skip(header.field_type)?,
            }
            reader.read_field_end()?;
        }
        reader.read_struct_end()?;
        self.check_cardinality(&values)?;
        Ok(Value::Struct(values))
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a union value for {}", self.name)))?;
        self.check_cardinality(s)?;
        writer.write_struct_begin()?;
        if let Some(fv) = s.fields().first() {
            if let Some(field) = self.field_by_id(fv.id) {
                writer.write_field_begin(&TFieldIdentifier::new(field.spec.ttype(), Some(field.id)))?;
                field.spec.write_to(writer, &fv.value)?;
                writer.write_field_end()?;
            }
        }
        writer.write_field_stop()?;
        writer.write_struct_end()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a union value for {}", self.name)))?;
        self.check_cardinality(s)?;
        if let Some(fv) = s.fields().first() {
            if let Some(field) = self.field_by_id(fv.id) {
                field.spec.validate(&fv.value)?;
            }
        }
        Ok(())
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        let s = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch(format!("expected a union value for {}", self.name)))?;
        self.check_cardinality(s)?;
        let mut obj = JsonMap::with_capacity(1);
        if let Some(fv) = s.fields().first() {
            if let Some(field) = self.field_by_id(fv.id) {
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
            if let Some(p) = obj.get(field.name.as_str()) {
                let v = field.spec.from_primitive(p)?;
                values.push(FieldValue::new(field.id, field.spec.ttype(), v));
            }
        }
        self.check_cardinality(&values)?;
        Ok(Value::Struct(values))
    }

    fn check_cardinality(&self, values: &StructValue) -> Result<()> {
        match values.len() {
            0 if self.allow_empty => Ok(()),
            1 => Ok(()),
            n => Err(Error::type_mismatch(format!(
                "union {} must carry exactly one field, found {}",
                self.name, n
            ))),
        }
    }
}
