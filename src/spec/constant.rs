//! `ConstSpec`: a named constant value bound to a type spec.

use crate::spec::TypeSpec;
use crate::value::{Name, Value};

pub struct ConstSpec {
    pub name: Name,
    pub spec: TypeSpec,
    pub value: Value,
}

impl ConstSpec {
    pub fn new(name: impl Into<Name>, spec: TypeSpec, value: Value) -> Self {
        ConstSpec {
            name: name.into(),
            spec,
            value,
        }
    }
}
