//! `FunctionSpec`: one RPC method. Compiling a function synthesizes two
//! struct-shaped specs that never appear in the IDL text — the
//! `<svc>_<fn>_request` args struct and the `<svc>_<fn>_response` result
//! union — so that the wire-framing machinery built for structs/unions
//! carries function calls for free (SPEC_FULL.md §4.4.8).

use std::collections::HashSet;

use crate::error::Result;
use crate::spec::struct_spec::FieldSpec;
use crate::spec::{StructKind, StructTypeSpec, TypeSpec, UnionTypeSpec};
use crate::value::Name;

pub struct FunctionSpec {
    pub name: Name,
    pub args_spec: TypeSpec,
    /// `None` only for `oneway` functions, which have no reply at all.
    pub result_spec: Option<TypeSpec>,
    pub oneway: bool,
}

impl FunctionSpec {
    /// `parameters` become the synthesized request struct's fields in
    /// declaration order (requiredness is not enforced on args, matching
    /// the teacher's leniency for wire-compatible RPC parameters).
    /// `exceptions` become additional fields of the synthesized response
    /// union, each keyed by its declared field id.
    pub fn new(
        service_name: &str,
        name: impl Into<Name>,
        parameters: Vec<FieldSpec>,
        return_type: Option<TypeSpec>,
        exceptions: Vec<FieldSpec>,
        oneway: bool,
    ) -> Result<Self> {
        let name = name.into();
        let args_spec = StructTypeSpec::new(
            format!("{service_name}_{name}_request"),
            StructKind::Plain,
            parameters
                .into_iter()
                .map(|mut f| {
                    f.required = false;
                    f
                })
                .collect(),
        )?;

        let result_spec = if oneway {
            None
        } else {
            let allow_empty = return_type.is_none();
            let mut known_exception_ids = HashSet::with_capacity(exceptions.len());
            let mut fields = Vec::with_capacity(exceptions.len() + 1);
            if let Some(ret) = return_type {
                fields.push(FieldSpec::new(0, "success", ret, false, None));
            }
            for exc in exceptions {
                known_exception_ids.insert(exc.id);
                fields.push(exc);
            }
            Some(UnionTypeSpec::with_exception_ids(
                format!("{service_name}_{name}_response"),
                fields,
                allow_empty,
                known_exception_ids,
            )?)
        };

        Ok(FunctionSpec {
            name,
            args_spec,
            result_spec,
            oneway,
        })
    }
}
