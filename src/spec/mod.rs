//! The typed intermediate representation of every declarable Thrift type.
//!
//! A `TypeSpec` is cheap to clone (an `Rc` to a shared node) because the
//! same spec is referenced from many places once linked: a struct holds its
//! field specs, a list holds its element spec, and cyclic graphs
//! (`Tree -> Leaf | Branch -> Tree`) hold `Rc` clones of each other.

pub mod constant;
pub mod container;
pub mod enum_spec;
pub mod function;
pub mod primitive;
pub mod reference;
pub mod service;
pub mod struct_spec;
pub mod typedef;
pub mod union_spec;

use std::rc::Rc;

use serde_json::Value as Primitive;

use crate::error::{Error, Result};
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::scope::Scope;
use crate::ttype::TType;
use crate::value::{Name, Value};

pub use constant::ConstSpec;
pub use container::{ListTypeSpec, MapTypeSpec, SetTypeSpec};
pub use enum_spec::EnumTypeSpec;
pub use function::FunctionSpec;
pub use primitive::PrimitiveTypeSpec;
pub use reference::TypeReference;
pub use service::ServiceSpec;
pub use struct_spec::{FieldSpec, StructTypeSpec};
pub use typedef::TypedefTypeSpec;
pub use union_spec::UnionTypeSpec;

/// Whether a struct-shaped spec represents a plain record or an
/// exception-like one. Both have identical wire shape and spec behavior;
/// `kind()` is the only observable difference within this core (see
/// SPEC_FULL.md §9, "Exceptions as structs").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StructKind {
    Plain,
    Exception,
}

/// Any node in the spec tree. Unlinked trees may still contain
/// `TypeSpec::Reference` leaves; after `link`, none remain reachable.
#[derive(Clone)]
pub enum TypeSpec {
    Primitive(Rc<PrimitiveTypeSpec>),
    List(Rc<ListTypeSpec>),
    Set(Rc<SetTypeSpec>),
    Map(Rc<MapTypeSpec>),
    Enum(Rc<EnumTypeSpec>),
    Struct(Rc<StructTypeSpec>),
    Union(Rc<UnionTypeSpec>),
    Typedef(Rc<TypedefTypeSpec>),
    Reference(Rc<TypeReference>),
}

impl TypeSpec {
    pub fn name(&self) -> Name {
        match self {
            TypeSpec::Primitive(s) => s.name(),
            TypeSpec::List(s) => s.name(),
            TypeSpec::Set(s) => s.name(),
            TypeSpec::Map(s) => s.name(),
            TypeSpec::Enum(s) => s.name.clone(),
            TypeSpec::Struct(s) => s.name.clone(),
            TypeSpec::Union(s) => s.name.clone(),
            TypeSpec::Typedef(s) => s.name.clone(),
            TypeSpec::Reference(s) => s.name.clone(),
        }
    }

    pub fn ttype(&self) -> TType {
        match self {
            TypeSpec::Primitive(s) => s.ttype(),
            TypeSpec::List(_) => TType::List,
            TypeSpec::Set(_) => TType::Set,
            TypeSpec::Map(_) => TType::Map,
            TypeSpec::Enum(_) => TType::I32,
            TypeSpec::Struct(_) | TypeSpec::Union(_) => TType::Struct,
            TypeSpec::Typedef(s) => s.target.ttype(),
            TypeSpec::Reference(_) => {
                unreachable!("TType requested from an unresolved TypeReference")
            }
        }
    }

    /// Resolve this spec against `scope`, replacing any `TypeReference`
    /// leaves in place. Idempotent and cycle-safe: composite specs guard
    /// re-entrancy via their own `linked` flag (see each variant's `link`).
    pub fn link(&self, scope: &Scope) -> Result<TypeSpec> {
        match self {
            TypeSpec::Primitive(_) => Ok(self.clone()),
            TypeSpec::List(s) => s.link(scope),
            TypeSpec::Set(s) => s.link(scope),
            TypeSpec::Map(s) => s.link(scope),
            TypeSpec::Enum(_) => Ok(self.clone()),
            TypeSpec::Struct(s) => s.link(scope),
            TypeSpec::Union(s) => s.link(scope),
            TypeSpec::Typedef(s) => s.link(scope),
            TypeSpec::Reference(r) => r.link(scope),
        }
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        match self {
            TypeSpec::Primitive(s) => s.read_from(reader),
            TypeSpec::List(s) => s.read_from(reader),
            TypeSpec::Set(s) => s.read_from(reader),
            TypeSpec::Map(s) => s.read_from(reader),
            TypeSpec::Enum(s) => s.read_from(reader),
            TypeSpec::Struct(s) => s.read_from(reader),
            TypeSpec::Union(s) => s.read_from(reader),
            TypeSpec::Typedef(s) => s.target.read_from(reader),
            TypeSpec::Reference(_) => Err(unresolved_reference()),
        }
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        match self {
            TypeSpec::Primitive(s) => s.write_to(writer, value),
            TypeSpec::List(s) => s.write_to(writer, value),
            TypeSpec::Set(s) => s.write_to(writer, value),
            TypeSpec::Map(s) => s.write_to(writer, value),
            TypeSpec::Enum(s) => s.write_to(writer, value),
            TypeSpec::Struct(s) => s.write_to(writer, value),
            TypeSpec::Union(s) => s.write_to(writer, value),
            TypeSpec::Typedef(s) => s.target.write_to(writer, value),
            TypeSpec::Reference(_) => Err(unresolved_reference()),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        match self {
            TypeSpec::Primitive(s) => s.validate(value),
            TypeSpec::List(s) => s.validate(value),
            TypeSpec::Set(s) => s.validate(value),
            TypeSpec::Map(s) => s.validate(value),
            TypeSpec::Enum(s) => s.validate(value),
            TypeSpec::Struct(s) => s.validate(value),
            TypeSpec::Union(s) => s.validate(value),
            TypeSpec::Typedef(s) => s.target.validate(value),
            TypeSpec::Reference(_) => Err(unresolved_reference()),
        }
    }

    /// The host value IS the wire value in this core (SPEC_FULL.md §9), so
    /// `to_wire`/`from_wire` are validating identity conversions.
    pub fn to_wire(&self, value: &Value) -> Result<Value> {
        self.validate(value)?;
        Ok(value.clone())
    }

    pub fn from_wire(&self, wire: Value) -> Result<Value> {
        self.validate(&wire)?;
        Ok(wire)
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        match self {
            TypeSpec::Primitive(s) => s.to_primitive(value),
            TypeSpec::List(s) => s.to_primitive(value),
            TypeSpec::Set(s) => s.to_primitive(value),
            TypeSpec::Map(s) => s.to_primitive(value),
            TypeSpec::Enum(s) => s.to_primitive(value),
            TypeSpec::Struct(s) => s.to_primitive(value),
            TypeSpec::Union(s) => s.to_primitive(value),
            TypeSpec::Typedef(s) => s.target.to_primitive(value),
            TypeSpec::Reference(_) => Err(unresolved_reference()),
        }
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        match self {
            TypeSpec::Primitive(s) => s.from_primitive(primitive),
            TypeSpec::List(s) => s.from_primitive(primitive),
            TypeSpec::Set(s) => s.from_primitive(primitive),
            TypeSpec::Map(s) => s.from_primitive(primitive),
            TypeSpec::Enum(s) => s.from_primitive(primitive),
            TypeSpec::Struct(s) => s.from_primitive(primitive),
            TypeSpec::Union(s) => s.from_primitive(primitive),
            TypeSpec::Typedef(s) => s.target.from_primitive(primitive),
            TypeSpec::Reference(_) => Err(unresolved_reference()),
        }
    }
}

fn unresolved_reference() -> Error {
    Error::new(
        crate::error::ErrorKind::TypeMismatch,
        "internal error: unresolved TypeReference reached a codec or bridge path",
    )
}
