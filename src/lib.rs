//! A runtime Thrift IDL compiler and Binary Protocol codec: given an AST
//! already produced by an external `.thrift` parser, this crate links it
//! into a tree of `TypeSpec`s and uses that tree to decode/encode values
//! without any code generation step.
//!
//! - [`ast`] — the parser's output contract.
//! - [`spec`] — the linked type tree (`TypeSpec` and its variants).
//! - [`scope`] — the two-phase compile→link linker.
//! - [`value`] — the protocol-independent wire/host value representation.
//! - [`protocol`] / [`binary`] — the protocol trait surface and its Binary
//!   Protocol implementation.
//! - [`bridge`] — struct/union construction from caller-supplied fields.
//! - [`module`] — `dumps`/`loads`/`dumps_message`/`loads_message` over a
//!   compiled module.

pub mod ast;
pub mod binary;
pub mod bridge;
pub mod buffer;
mod error;
pub mod module;
pub mod protocol;
pub mod scope;
pub mod spec;
pub mod ttype;
pub mod value;

pub use error::{Error, ErrorKind, Result};

pub use ast::Program;
pub use buffer::Limits;
pub use module::{dumps, dumps_message, loads, loads_message, Message, Module};
pub use scope::Scope;
pub use spec::TypeSpec;
pub use ttype::{TMessageType, TType};
pub use value::{FieldValue, ListValue, MapValue, Name, SetValue, StructValue, Value};
