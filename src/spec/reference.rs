//! `TypeReference`: a placeholder for a named type seen in the AST before
//! linking has resolved it against the scope. Never reachable after `link`.

use std::rc::Rc;

use crate::error::Result;
use crate::scope::Scope;
use crate::spec::TypeSpec;
use crate::value::Name;

pub struct TypeReference {
    pub name: Name,
    pub lineno: Option<u32>,
}

impl TypeReference {
    pub fn new(name: impl Into<Name>, lineno: Option<u32>) -> TypeSpec {
        TypeSpec::Reference(Rc::new(TypeReference {
            name: name.into(),
            lineno,
        }))
    }

    pub fn link(&self, scope: &Scope) -> Result<TypeSpec> {
        scope.resolve_type_spec(&self.name, self.lineno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ttype::TType;

    #[test]
    fn link_resolves_against_the_scope() {
        let scope = Scope::new();
        let spec = TypeReference::new("i32", None);
        let linked = spec.link(&scope).unwrap();
        assert_eq!(linked.ttype(), TType::I32);
    }

    #[test]
    fn link_fails_on_an_unknown_name() {
        let scope = Scope::new();
        let spec = TypeReference::new("NoSuchType", Some(7));
        let err = spec.link(&scope).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(Some(7))));
    }
}
