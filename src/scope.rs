//! The two-phase compile→link linker (SPEC_FULL.md §4.5). `compile` builds
//! every definition into an unlinked spec tree (so name references can point
//! forward), then `link` walks every root and resolves `TypeReference`
//! leaves in place. Each composite spec protects itself with its own
//! `linked` flag, which is what lets `Tree -> Leaf | Branch -> Tree` cycles
//! terminate: see each variant's `link` method in `crate::spec`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as Primitive};

use crate::ast::{self, ConstValue, Definition, Program, TypeRef};
use crate::error::{Error, Result};
use crate::spec::struct_spec::FieldSpec;
use crate::spec::{
    ConstSpec, EnumTypeSpec, FunctionSpec, ListTypeSpec, MapTypeSpec, PrimitiveTypeSpec, ServiceSpec, SetTypeSpec,
    StructKind, StructTypeSpec, TypeReference, TypeSpec, UnionTypeSpec,
};
use crate::value::{Name, Value};

/// A single field's literal default, deferred until its containing type has
/// been linked (so enum/struct field types used by the default are
/// resolvable). See `resolve_pending_defaults`.
struct PendingDefault {
    owner: TypeSpec,
    field_id: i16,
    raw: ConstValue,
}

pub struct Scope {
    types: RefCell<HashMap<Name, TypeSpec>>,
    services: RefCell<HashMap<Name, Rc<ServiceSpec>>>,
    consts: RefCell<HashMap<Name, Rc<ConstSpec>>>,
    includes: RefCell<HashMap<Name, Rc<Scope>>>,
}

impl Scope {
    pub fn new() -> Rc<Scope> {
        let scope = Rc::new(Scope {
            types: RefCell::new(HashMap::new()),
            services: RefCell::new(HashMap::new()),
            consts: RefCell::new(HashMap::new()),
            includes: RefCell::new(HashMap::new()),
        });
        for (name, spec) in [
            ("bool", PrimitiveTypeSpec::bool()),
            ("byte", PrimitiveTypeSpec::byte()),
            ("i16", PrimitiveTypeSpec::i16()),
            ("i32", PrimitiveTypeSpec::i32()),
            ("i64", PrimitiveTypeSpec::i64()),
            ("double", PrimitiveTypeSpec::double()),
            ("string", PrimitiveTypeSpec::string()),
            ("binary", PrimitiveTypeSpec::binary()),
        ] {
            scope.types.borrow_mut().insert(Name::new(name), spec);
        }
        scope
    }

    /// Makes `alias.Name` resolvable against another module's already-linked
    /// scope (SPEC_FULL.md §4.5, "handles to other loaded modules").
    pub fn add_include(&self, alias: impl Into<Name>, other: Rc<Scope>) {
        self.includes.borrow_mut().insert(alias.into(), other);
    }

    pub fn resolve_type_spec(&self, name: &str, lineno: Option<u32>) -> Result<TypeSpec> {
        if let Some((alias, rest)) = name.split_once('.') {
            let includes = self.includes.borrow();
            return match includes.get(alias) {
                Some(other) => other.resolve_type_spec(rest, lineno),
                None => {
                    tracing::warn!(alias, "unknown include alias");
                    Err(Error::compile(format!("unknown include alias {alias}"), lineno))
                }
            };
        }
        self.types.borrow().get(name).cloned().ok_or_else(|| {
            tracing::warn!(name, ?lineno, "unresolved type reference");
            Error::compile(format!("unresolved type reference {name}"), lineno)
        })
    }

    pub fn service(&self, name: &str) -> Option<Rc<ServiceSpec>> {
        self.services.borrow().get(name).cloned()
    }

    pub fn type_spec(&self, name: &str) -> Option<TypeSpec> {
        self.types.borrow().get(name).cloned()
    }

    pub fn const_spec(&self, name: &str) -> Option<Rc<ConstSpec>> {
        self.consts.borrow().get(name).cloned()
    }

    pub fn type_names(&self) -> Vec<Name> {
        self.types.borrow().keys().cloned().collect()
    }

    pub fn service_names(&self) -> Vec<Name> {
        self.services.borrow().keys().cloned().collect()
    }

    /// Runs the full compile→link pipeline over a parsed program, returning
    /// a scope whose `types`/`services`/`consts` tables hold fully linked
    /// specs.
    pub fn compile(program: &Program) -> Result<Rc<Scope>> {
        let scope = Scope::new();
        let mut pending_defaults = Vec::new();
        let mut pending_consts = Vec::new();

        for def in &program.definitions {
            match def {
                Definition::Typedef(d) => {
                    let target = ast_type_to_spec(&d.target_type);
                    let spec = crate::spec::TypedefTypeSpec::new(d.name.clone(), target);
                    scope.types.borrow_mut().insert(d.name.clone(), spec);
                }
                Definition::Enum(d) => {
                    let spec = build_enum(d)?;
                    scope.types.borrow_mut().insert(d.name.clone(), spec);
                }
                Definition::Struct(d) => {
                    let spec = build_struct(d, StructKind::Plain, &mut pending_defaults)?;
                    scope.types.borrow_mut().insert(d.name.clone(), spec);
                }
                Definition::Exception(d) => {
                    let spec = build_struct(d, StructKind::Exception, &mut pending_defaults)?;
                    scope.types.borrow_mut().insert(d.name.clone(), spec);
                }
                Definition::Union(d) => {
                    let spec = build_union(d)?;
                    scope.types.borrow_mut().insert(d.name.clone(), spec);
                }
                Definition::Const(d) => {
                    let const_type = ast_type_to_spec(&d.const_type);
                    pending_consts.push((d.name.clone(), const_type, d.value.clone()));
                }
                Definition::Service(d) => {
                    let svc = build_service(d, &scope)?;
                    scope.services.borrow_mut().insert(d.name.clone(), svc);
                }
            }
        }

        // Link every registered root. Each spec's own `linked` flag makes
        // this idempotent and cycle-safe.
        let names = scope.type_names();
        for name in &names {
            let unlinked = scope.types.borrow().get(name).cloned().expect("just listed");
            let linked = unlinked.link(&scope)?;
            scope.types.borrow_mut().insert(name.clone(), linked);
        }
        for name in scope.service_names() {
            let svc = scope.services.borrow().get(&name).cloned().expect("just listed");
            for f in svc.own_functions() {
                f.args_spec.link(&scope)?;
                if let Some(result) = &f.result_spec {
                    result.link(&scope)?;
                }
            }
        }

        scope.resolve_pending_defaults(pending_defaults)?;
        scope.resolve_pending_consts(pending_consts)?;

        tracing::debug!(
            types = scope.types.borrow().len(),
            services = scope.services.borrow().len(),
            consts = scope.consts.borrow().len(),
            "linked module"
        );

        Ok(scope)
    }

    fn resolve_pending_defaults(&self, pending: Vec<PendingDefault>) -> Result<()> {
        for p in pending {
            let field = match &p.owner {
                TypeSpec::Struct(s) => s.field_by_id(p.field_id),
                TypeSpec::Union(s) => s.field_by_id(p.field_id),
                _ => None,
            };
            let Some(field) = field else { continue };
            let value = self.resolve_const_value(&field.spec, &p.raw)?;
            match &p.owner {
                TypeSpec::Struct(s) => s.set_default(p.field_id, value),
                TypeSpec::Union(s) => s.set_default(p.field_id, value),
                _ => {}
            }
        }
        Ok(())
    }

    fn resolve_pending_consts(&self, pending: Vec<(Name, TypeSpec, ConstValue)>) -> Result<()> {
        for (name, const_type, raw) in pending {
            let linked_type = const_type.link(self)?;
            let value = self.resolve_const_value(&linked_type, &raw)?;
            self.consts
                .borrow_mut()
                .insert(name.clone(), Rc::new(ConstSpec::new(name, linked_type, value)));
        }
        Ok(())
    }

    /// Converts a literal `ConstValue` into a host `Value` against the
    /// (already linked) `spec` it is meant to satisfy. `Identifier` first
    /// tries a previously-resolved constant, then falls back to treating the
    /// name as an enum item (handled by `EnumTypeSpec::from_primitive`).
    fn resolve_const_value(&self, spec: &TypeSpec, raw: &ConstValue) -> Result<Value> {
        if let ConstValue::Identifier(name) = raw {
            if let Some(c) = self.const_spec(name) {
                return Ok(c.value.clone());
            }
            return spec.from_primitive(&Primitive::String(name.to_string()));
        }
        let primitive = const_value_to_primitive(raw);
        spec.from_primitive(&primitive)
    }
}

fn ast_type_to_spec(type_ref: &TypeRef) -> TypeSpec {
    match type_ref {
        TypeRef::Bool => PrimitiveTypeSpec::bool(),
        TypeRef::Byte => PrimitiveTypeSpec::byte(),
        TypeRef::I16 => PrimitiveTypeSpec::i16(),
        TypeRef::I32 => PrimitiveTypeSpec::i32(),
        TypeRef::I64 => PrimitiveTypeSpec::i64(),
        TypeRef::Double => PrimitiveTypeSpec::double(),
        TypeRef::Binary => PrimitiveTypeSpec::binary(),
        TypeRef::String => PrimitiveTypeSpec::string(),
        TypeRef::List(elem) => ListTypeSpec::new(ast_type_to_spec(elem)),
        TypeRef::Set(elem) => SetTypeSpec::new(ast_type_to_spec(elem)),
        TypeRef::Map(key, val) => MapTypeSpec::new(ast_type_to_spec(key), ast_type_to_spec(val)),
        TypeRef::Named(name) => TypeReference::new(name.clone(), None),
    }
}

fn build_enum(d: &ast::EnumDef) -> Result<TypeSpec> {
    let mut items = Vec::with_capacity(d.items.len());
    let mut next_value = 0i32;
    for item in &d.items {
        let value = item.value.unwrap_or(next_value);
        next_value = value + 1;
        items.push((item.name.clone(), value));
    }
    EnumTypeSpec::new(d.name.clone(), items)
}

/// Builds `FieldSpec`s for a field list, returning alongside them any
/// literal defaults (as raw `(field_id, ConstValue)` pairs) still needing
/// conversion once the owning type is known and linked.
fn build_fields(fields: &[ast::Field]) -> Result<(Vec<FieldSpec>, Vec<(i16, ConstValue)>)> {
    let mut out = Vec::with_capacity(fields.len());
    let mut defaults = Vec::new();
    for f in fields {
        let id = f
            .id
            .ok_or_else(|| Error::compile(format!("field {} is missing an explicit id", f.name), f.lineno))?;
        let spec = ast_type_to_spec(&f.field_type);
        let required = matches!(f.requiredness, Some(ast::Requiredness::Required));
        out.push(FieldSpec::new(id, f.name.clone(), spec, required, None));
        if let Some(raw) = &f.default {
            defaults.push((id, raw.clone()));
        }
    }
    Ok((out, defaults))
}

fn build_struct(d: &ast::StructDef, kind: StructKind, pending: &mut Vec<PendingDefault>) -> Result<TypeSpec> {
    let (fields, defaults) = build_fields(&d.fields)?;
    let spec = StructTypeSpec::new(d.name.clone(), kind, fields)?;
    for (field_id, raw) in defaults {
        pending.push(PendingDefault {
            owner: spec.clone(),
            field_id,
            raw,
        });
    }
    Ok(spec)
}

fn build_union(d: &ast::StructDef) -> Result<TypeSpec> {
    for f in &d.fields {
        if matches!(f.requiredness, Some(ast::Requiredness::Required)) {
            return Err(Error::compile(
                format!("union field {} may not be marked required", f.name),
                f.lineno,
            ));
        }
        if f.default.is_some() {
            return Err(Error::compile(
                format!("union field {} may not carry a default value", f.name),
                f.lineno,
            ));
        }
    }
    let (fields, _defaults) = build_fields(&d.fields)?;
    UnionTypeSpec::new(d.name.clone(), fields, false)
}

fn build_service(d: &ast::ServiceDef, scope: &Rc<Scope>) -> Result<Rc<ServiceSpec>> {
    let parent = match &d.parent {
        Some(name) => Some(scope.service(name).ok_or_else(|| {
            tracing::warn!(service = %d.name, parent = %name, "inherits undefined service");
            Error::compile(format!("service {} inherits undefined service {name}", d.name), d.lineno)
        })?),
        None => None,
    };

    let mut functions = Vec::with_capacity(d.functions.len());
    for f in &d.functions {
        if f.oneway && (f.return_type.is_some() || !f.exceptions.is_empty()) {
            return Err(Error::compile(
                format!("oneway function {} may not declare a return type or exceptions", f.name),
                f.lineno,
            ));
        }
        let (parameters, _param_defaults) = build_fields(&f.parameters)?;
        let (exceptions, _exc_defaults) = build_fields(&f.exceptions)?;
        let return_type = f.return_type.as_ref().map(ast_type_to_spec);
        functions.push(FunctionSpec::new(
            &d.name,
            f.name.clone(),
            parameters,
            return_type,
            exceptions,
            f.oneway,
        )?);
    }

    ServiceSpec::new(d.name.clone(), parent, functions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConstDef, EnumDef, EnumItem, Field, Requiredness, StructDef, TypeRef};
    use crate::error::ErrorKind;

    fn field(id: i16, name: &str, ty: TypeRef, required: bool, default: Option<ConstValue>) -> Field {
        Field {
            id: Some(id),
            name: Name::new(name),
            field_type: ty,
            requiredness: if required { Some(Requiredness::Required) } else { None },
            default,
            lineno: None,
        }
    }

    #[test]
    fn compiles_a_struct_with_a_default_value() {
        let program = Program {
            headers: vec![],
            definitions: vec![Definition::Struct(StructDef {
                name: Name::new("Person"),
                fields: vec![
                    field(1, "name", TypeRef::String, true, None),
                    field(2, "age", TypeRef::I32, false, Some(ConstValue::Int(0))),
                ],
                lineno: None,
            })],
        };
        let scope = Scope::compile(&program).unwrap();
        let spec = scope.type_spec("Person").unwrap();
        let field2 = match &spec {
            TypeSpec::Struct(s) => s.field_by_id(2).unwrap(),
            _ => panic!("expected a struct"),
        };
        assert_eq!(field2.default, Some(Value::I32(0)));
    }

    #[test]
    fn enum_items_auto_number_from_zero() {
        let program = Program {
            headers: vec![],
            definitions: vec![Definition::Enum(EnumDef {
                name: Name::new("Color"),
                items: vec![
                    EnumItem { name: Name::new("Red"), value: None, lineno: None },
                    EnumItem { name: Name::new("Green"), value: None, lineno: None },
                    EnumItem { name: Name::new("Blue"), value: Some(10), lineno: None },
                    EnumItem { name: Name::new("Indigo"), value: None, lineno: None },
                ],
                lineno: None,
            })],
        };
        let scope = Scope::compile(&program).unwrap();
        let spec = scope.type_spec("Color").unwrap();
        let e = match &spec {
            TypeSpec::Enum(e) => e,
            _ => panic!("expected an enum"),
        };
        assert_eq!(e.value_of("Red"), Some(0));
        assert_eq!(e.value_of("Green"), Some(1));
        assert_eq!(e.value_of("Blue"), Some(10));
        assert_eq!(e.value_of("Indigo"), Some(11));
    }

    #[test]
    fn forward_reference_and_cycle_terminate() {
        // Tree -> Leaf | Branch; Branch -> left: Tree, right: Tree.
        let program = Program {
            headers: vec![],
            definitions: vec![
                Definition::Union(StructDef {
                    name: Name::new("Tree"),
                    fields: vec![
                        field(1, "leaf", TypeRef::Named(Name::new("Leaf")), false, None),
                        field(2, "branch", TypeRef::Named(Name::new("Branch")), false, None),
                    ],
                    lineno: None,
                }),
                Definition::Struct(StructDef {
                    name: Name::new("Leaf"),
                    fields: vec![field(1, "value", TypeRef::I32, false, None)],
                    lineno: None,
                }),
                Definition::Struct(StructDef {
                    name: Name::new("Branch"),
                    fields: vec![
                        field(1, "left", TypeRef::Named(Name::new("Tree")), false, None),
                        field(2, "right", TypeRef::Named(Name::new("Tree")), false, None),
                    ],
                    lineno: None,
                }),
            ],
        };
        let scope = Scope::compile(&program).unwrap();
        let tree = scope.type_spec("Tree").unwrap();
        match &tree {
            TypeSpec::Union(u) => {
                let branch_field = u.field_by_id(2).unwrap();
                match branch_field.spec {
                    TypeSpec::Struct(_) => {}
                    _ => panic!("Branch should have linked to a struct"),
                }
            }
            _ => panic!("expected a union"),
        }
    }

    #[test]
    fn const_identifier_resolves_to_an_enum_item() {
        let program = Program {
            headers: vec![],
            definitions: vec![
                Definition::Enum(EnumDef {
                    name: Name::new("Color"),
                    items: vec![
                        EnumItem { name: Name::new("Red"), value: None, lineno: None },
                        EnumItem { name: Name::new("Green"), value: None, lineno: None },
                    ],
                    lineno: None,
                }),
                Definition::Const(ConstDef {
                    name: Name::new("DEFAULT_COLOR"),
                    const_type: TypeRef::Named(Name::new("Color")),
                    value: ConstValue::Identifier(Name::new("Green")),
                    lineno: None,
                }),
            ],
        };
        let scope = Scope::compile(&program).unwrap();
        let c = scope.const_spec("DEFAULT_COLOR").unwrap();
        assert_eq!(c.value, Value::I32(1));
    }

    #[test]
    fn service_with_unknown_parent_fails_to_compile() {
        use crate::ast::{Function, ServiceDef};
        let program = Program {
            headers: vec![],
            definitions: vec![Definition::Service(ServiceDef {
                name: Name::new("Derived"),
                parent: Some(Name::new("NoSuchBase")),
                functions: vec![Function {
                    name: Name::new("ping"),
                    return_type: None,
                    parameters: vec![],
                    exceptions: vec![],
                    oneway: false,
                    lineno: None,
                }],
                lineno: None,
            })],
        };
        let err = Scope::compile(&program).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(_)));
    }

    #[test]
    fn union_field_marked_required_is_rejected() {
        let program = Program {
            headers: vec![],
            definitions: vec![Definition::Union(StructDef {
                name: Name::new("BadUnion"),
                fields: vec![field(1, "x", TypeRef::I32, true, None)],
                lineno: None,
            })],
        };
        let err = Scope::compile(&program).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Compile(_)));
    }
}

fn const_value_to_primitive(cv: &ConstValue) -> Primitive {
    match cv {
        ConstValue::Bool(b) => Primitive::Bool(*b),
        ConstValue::Int(i) => Primitive::Number((*i).into()),
        ConstValue::Double(d) => serde_json::Number::from_f64(*d)
            .map(Primitive::Number)
            .unwrap_or(Primitive::Null),
        ConstValue::String(s) => Primitive::String(s.clone()),
        ConstValue::List(items) => Primitive::Array(items.iter().map(const_value_to_primitive).collect()),
        ConstValue::Map(pairs) => {
            let mut obj = JsonMap::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = match const_value_to_primitive(k) {
                    Primitive::String(s) => s,
                    other => other.to_string(),
                };
                obj.insert(key, const_value_to_primitive(v));
            }
            Primitive::Object(obj)
        }
        ConstValue::Identifier(name) => Primitive::String(name.to_string()),
    }
}
