//! Protocol-level trait surface. `crate::binary` is the only implementation
//! in this core (the Thrift Binary Protocol), but the traits are kept
//! separate from that implementation the way the teacher crate separates
//! `protocol.rs` from `binary.rs`.

use crate::error::Result;
use crate::ttype::{TMessageType, TType};
use crate::value::Name;

/// Identifies a Thrift message envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TMessageIdentifier {
    pub name: Name,
    pub message_type: TMessageType,
    pub sequence_number: i32,
}

impl TMessageIdentifier {
    pub fn new(name: impl Into<Name>, message_type: TMessageType, sequence_number: i32) -> Self {
        TMessageIdentifier {
            name: name.into(),
            message_type,
            sequence_number,
        }
    }
}

/// Identifies a struct field on the wire. `id` is `None` only when
/// `field_type` is `TType::Stop`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TFieldIdentifier {
    pub field_type: TType,
    pub id: Option<i16>,
}

impl TFieldIdentifier {
    pub fn new(field_type: TType, id: Option<i16>) -> Self {
        TFieldIdentifier { field_type, id }
    }

    pub fn is_stop(&self) -> bool {
        self.field_type == TType::Stop
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TListIdentifier {
    pub element_type: TType,
    pub size: usize,
}

impl TListIdentifier {
    pub fn new(element_type: TType, size: usize) -> Self {
        TListIdentifier { element_type, size }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TSetIdentifier {
    pub element_type: TType,
    pub size: usize,
}

impl TSetIdentifier {
    pub fn new(element_type: TType, size: usize) -> Self {
        TSetIdentifier { element_type, size }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TMapIdentifier {
    pub key_type: TType,
    pub value_type: TType,
    pub size: usize,
}

impl TMapIdentifier {
    pub fn new(key_type: TType, value_type: TType, size: usize) -> Self {
        TMapIdentifier {
            key_type,
            value_type,
            size,
        }
    }
}

/// Reads a Thrift value stream. Not safe for concurrent use — a reader
/// borrows its buffer exclusively for the lifetime of a read.
pub trait TInputProtocol {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier>;
    fn read_message_end(&mut self) -> Result<()>;

    fn read_struct_begin(&mut self) -> Result<()>;
    fn read_struct_end(&mut self) -> Result<()>;

    /// Returns a `TFieldIdentifier` with `field_type == TType::Stop` at the
    /// end of a struct.
    fn read_field_begin(&mut self) -> Result<TFieldIdentifier>;
    fn read_field_end(&mut self) -> Result<()>;

    fn read_list_begin(&mut self) -> Result<TListIdentifier>;
    fn read_list_end(&mut self) -> Result<()>;

    fn read_set_begin(&mut self) -> Result<TSetIdentifier>;
    fn read_set_end(&mut self) -> Result<()>;

    fn read_map_begin(&mut self) -> Result<TMapIdentifier>;
    fn read_map_end(&mut self) -> Result<()>;

    fn read_bool(&mut self) -> Result<bool>;
    fn read_byte(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_binary(&mut self) -> Result<Vec<u8>>;
    fn read_string(&mut self) -> Result<String>;

    /// Discard a value of `ttype` using the protocol's own structure,
    /// without materializing any host object.
    fn skip(&mut self, ttype: TType) -> Result<()>;
}

/// Writes a Thrift value stream.
pub trait TOutputProtocol {
    fn write_message_begin(&mut self, identifier: &TMessageIdentifier) -> Result<()>;
    fn write_message_end(&mut self) -> Result<()>;

    fn write_struct_begin(&mut self) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;

    fn write_field_begin(&mut self, identifier: &TFieldIdentifier) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_field_stop(&mut self) -> Result<()>;

    fn write_list_begin(&mut self, identifier: &TListIdentifier) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;

    fn write_set_begin(&mut self, identifier: &TSetIdentifier) -> Result<()>;
    fn write_set_end(&mut self) -> Result<()>;

    fn write_map_begin(&mut self, identifier: &TMapIdentifier) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;

    fn write_bool(&mut self, b: bool) -> Result<()>;
    fn write_byte(&mut self, b: i8) -> Result<()>;
    fn write_i16(&mut self, i: i16) -> Result<()>;
    fn write_i32(&mut self, i: i32) -> Result<()>;
    fn write_i64(&mut self, i: i64) -> Result<()>;
    fn write_double(&mut self, d: f64) -> Result<()>;
    fn write_binary(&mut self, b: &[u8]) -> Result<()>;
    fn write_string(&mut self, s: &str) -> Result<()>;
}
