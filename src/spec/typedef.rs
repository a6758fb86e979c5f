//! `TypedefTypeSpec`: a name bound to another spec. Transparent at runtime —
//! `link` hands back the resolved target directly rather than keeping the
//! typedef wrapper alive, since nothing downstream needs to distinguish
//! "declared as `MyId`" from "declared as `i64`" once linking is done.

use std::rc::Rc;

use crate::error::Result;
use crate::scope::Scope;
use crate::spec::TypeSpec;
use crate::value::Name;

pub struct TypedefTypeSpec {
    pub name: Name,
    pub target: TypeSpec,
}

impl TypedefTypeSpec {
    pub fn new(name: impl Into<Name>, target: TypeSpec) -> TypeSpec {
        TypeSpec::Typedef(Rc::new(TypedefTypeSpec {
            name: name.into(),
            target,
        }))
    }

    /// Returns the linked target directly; the typedef name stays registered
    /// in the scope for lookup, but the returned `TypeSpec` carries no
    /// `Typedef` wrapper once this resolves.
    pub fn link(&self, scope: &Scope) -> Result<TypeSpec> {
        self.target.link(scope)
    }
}
