//! `ServiceSpec`: a named collection of `FunctionSpec`s, optionally
//! inheriting another service's functions by name.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::spec::FunctionSpec;
use crate::value::Name;

pub struct ServiceSpec {
    pub name: Name,
    pub parent: Option<Rc<ServiceSpec>>,
    functions: Vec<FunctionSpec>,
    index: HashMap<Name, usize>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<Name>, parent: Option<Rc<ServiceSpec>>, functions: Vec<FunctionSpec>) -> Result<Rc<Self>> {
        let name = name.into();
        let mut index = HashMap::with_capacity(functions.len());
        for (i, f) in functions.iter().enumerate() {
            if index.insert(f.name.clone(), i).is_some() {
                return Err(Error::compile(
                    format!("duplicate function name {} in service {name}", f.name),
                    None,
                ));
            }
            if let Some(p) = &parent {
                if p.function(&f.name).is_some() {
                    return Err(Error::compile(
                        format!("function {} in service {name} shadows an inherited function", f.name),
                        None,
                    ));
                }
            }
        }
        Ok(Rc::new(ServiceSpec {
            name,
            parent,
            functions,
            index,
        }))
    }

    /// Looks up a function by name, falling back to the parent service chain
    /// (SPEC_FULL.md §4.4.8, "Compile constructs... link resolves... parent
    /// first").
    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        if let Some(&i) = self.index.get(name) {
            return Some(&self.functions[i]);
        }
        self.parent.as_ref().and_then(|p| p.function(name))
    }

    /// All functions declared directly on this service, excluding those
    /// inherited from a parent.
    pub fn own_functions(&self) -> &[FunctionSpec] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn noop(name: &str) -> FunctionSpec {
        FunctionSpec::new("Svc", name, vec![], None, vec![], false).unwrap()
    }

    #[test]
    fn rejects_duplicate_function_names() {
        let err = ServiceSpec::new("Svc", None, vec![noop("ping"), noop("ping")]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(_)));
    }

    #[test]
    fn child_function_lookup_falls_back_to_parent() {
        let parent = ServiceSpec::new("Base", None, vec![noop("ping")]).unwrap();
        let child = ServiceSpec::new("Derived", Some(parent), vec![noop("pong")]).unwrap();
        assert!(child.function("pong").is_some());
        assert!(child.function("ping").is_some());
        assert!(child.function("missing").is_none());
    }

    #[test]
    fn rejects_a_function_that_shadows_an_inherited_one() {
        let parent = ServiceSpec::new("Base", None, vec![noop("ping")]).unwrap();
        let err = ServiceSpec::new("Derived", Some(parent), vec![noop("ping")]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(_)));
    }

    #[test]
    fn own_functions_excludes_inherited_ones() {
        let parent = ServiceSpec::new("Base", None, vec![noop("ping")]).unwrap();
        let child = ServiceSpec::new("Derived", Some(parent), vec![noop("pong")]).unwrap();
        assert_eq!(child.own_functions().len(), 1);
        assert_eq!(child.own_functions()[0].name, "pong");
    }
}
