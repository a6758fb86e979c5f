//! The Thrift Binary Protocol: a `ReadBuffer`/`WriteBuffer`-backed codec
//! implementing `TInputProtocol`/`TOutputProtocol`.

use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;

use crate::buffer::{Limits, ReadBuffer, WriteBuffer};
use crate::error::{Error, Result};
use crate::protocol::{
    TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier, TMessageIdentifier,
    TOutputProtocol, TSetIdentifier,
};
use crate::ttype::{TMessageType, TType};

const VERSION_1: i32 = 0x8001_0000u32 as i32;
const VERSION_MASK: i32 = 0xffff_0000u32 as i32;

const MOST_COMMON_SKIP_DEPTH: usize = 16;

fn ttype_from_byte(byte: u8) -> Result<TType> {
    TType::try_from(byte).map_err(|_| Error::invalid_data(format!("invalid ttype {byte}")))
}

/// States in the iterative skip walk: either "skip one value of this ttype",
/// or "skip `remaining` more elements alternating between `ttypes[0]` and
/// `ttypes[1]`" (list/set repeat one type; map alternates key/value).
#[derive(Debug)]
enum SkipState {
    Value(TType),
    Collection(u32, [TType; 2]),
}

/// A reader over an immutable byte slice. `read_message_begin` auto-detects
/// strict vs non-strict framing; all writes are strict.
pub struct TBinaryInputProtocol<'a> {
    buf: ReadBuffer<'a>,
    limits: Limits,
    depth: usize,
}

impl<'a> TBinaryInputProtocol<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        TBinaryInputProtocol::with_limits(data, Limits::unbounded())
    }

    pub fn with_limits(data: &'a [u8], limits: Limits) -> Self {
        TBinaryInputProtocol {
            buf: ReadBuffer::new(data),
            limits,
            depth: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.buf.position()
    }

    fn read_i32_raw(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.buf.read(4)?))
    }

    fn read_bytes_checked(&mut self) -> Result<Vec<u8>> {
        let len = self.read_i32_raw()?;
        if len < 0 {
            return Err(Error::invalid_data(format!("negative byte array size {len}")));
        }
        let len = len as usize;
        self.limits.check_string_size(len)?;
        self.buf.take(len)
    }

    fn checked_container_size(&self, size: i32) -> Result<usize> {
        if size < 0 {
            return Err(Error::invalid_data(format!("negative container size {size}")));
        }
        let size = size as usize;
        self.limits.check_container_size(size)?;
        Ok(size)
    }
}

impl<'a> TInputProtocol for TBinaryInputProtocol<'a> {
    fn read_message_begin(&mut self) -> Result<TMessageIdentifier> {
        let first = self.read_i32_raw()?;

        if first < 0 {
            let version = first & VERSION_MASK;
            if version != VERSION_1 {
                return Err(Error::unsupported_version(format!(
                    "unsupported protocol version {version:#x}"
                )));
            }
            let message_type = TMessageType::try_from((first & 0xff) as u8)
                .map_err(|_| Error::invalid_data("invalid message type"))?;
            let name = self.read_string()?;
            let sequence_number = self.read_i32_raw()?;
            Ok(TMessageIdentifier::new(name, message_type, sequence_number))
        } else {
            let name_len = first as usize;
            self.limits.check_string_size(name_len)?;
            let name_bytes = self.buf.take(name_len)?;
            let name = String::from_utf8(name_bytes)
                .map_err(|_| Error::invalid_data("not a valid utf8 string"))?;
            let message_type_byte = self.buf.read(1)?[0];
            let message_type = TMessageType::try_from(message_type_byte)
                .map_err(|_| Error::invalid_data("invalid message type"))?;
            let sequence_number = self.read_i32_raw()?;
            Ok(TMessageIdentifier::new(name, message_type, sequence_number))
        }
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.depth += 1;
        self.limits.check_depth(self.depth)?;
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<TFieldIdentifier> {
        let field_type = ttype_from_byte(self.buf.read(1)?[0])?;
        if field_type == TType::Stop {
            return Ok(TFieldIdentifier::new(TType::Stop, None));
        }
        let id = self.read_i16()?;
        Ok(TFieldIdentifier::new(field_type, Some(id)))
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<TListIdentifier> {
        let element_type = ttype_from_byte(self.buf.read(1)?[0])?;
        let size = self.checked_container_size(self.read_i32_raw()?)?;
        Ok(TListIdentifier::new(element_type, size))
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<TSetIdentifier> {
        let element_type = ttype_from_byte(self.buf.read(1)?[0])?;
        let size = self.checked_container_size(self.read_i32_raw()?)?;
        Ok(TSetIdentifier::new(element_type, size))
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<TMapIdentifier> {
        let key_type = ttype_from_byte(self.buf.read(1)?[0])?;
        let value_type = ttype_from_byte(self.buf.read(1)?[0])?;
        let size = self.checked_container_size(self.read_i32_raw()?)?;
        Ok(TMapIdentifier::new(key_type, value_type, size))
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.buf.read(1)?[0] != 0)
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.buf.read(1)?[0] as i8)
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.buf.read(2)?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_i32_raw()
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.buf.read(8)?))
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.buf.read(8)?))
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        self.read_bytes_checked()
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes_checked()?;
        String::from_utf8(bytes).map_err(|_| Error::invalid_data("not a valid utf8 string"))
    }

    /// Discards a value of `ttype` without materializing it, via an explicit
    /// work stack rather than recursion, so a deeply nested container on
    /// untrusted input cannot blow the call stack.
    fn skip(&mut self, ttype: TType) -> Result<()> {
        let mut stack: SmallVec<[SkipState; MOST_COMMON_SKIP_DEPTH]> = SmallVec::new();
        let mut current = SkipState::Value(ttype);

        loop {
            match current {
                SkipState::Value(TType::Struct) => {
                    self.limits.check_depth(stack.len() + 1)?;
                    let field_type = ttype_from_byte(self.buf.read(1)?[0])?;
                    match field_type {
                        TType::Stop => match stack.pop() {
                            Some(next) => current = next,
                            None => break,
                        },
                        _ => {
                            self.buf.skip(2)?; // field id
                            stack.push(SkipState::Value(TType::Struct));
                            current = SkipState::Value(field_type);
                        }
                    }
                }
                SkipState::Value(ttype) => {
                    match ttype {
                        TType::Bool | TType::Byte => self.buf.skip(1)?,
                        TType::Double | TType::I64 => self.buf.skip(8)?,
                        TType::I16 => self.buf.skip(2)?,
                        TType::I32 => self.buf.skip(4)?,
                        TType::Binary => {
                            let len = self.checked_container_size(self.read_i32_raw()?)?;
                            self.buf.skip(len)?;
                        }
                        TType::List | TType::Set => {
                            let element_type = ttype_from_byte(self.buf.read(1)?[0])?;
                            let len = self.checked_container_size(self.read_i32_raw()?)? as u32;
                            current = SkipState::Collection(len, [element_type, element_type]);
                            continue;
                        }
                        TType::Map => {
                            let key_type = ttype_from_byte(self.buf.read(1)?[0])?;
                            let value_type = ttype_from_byte(self.buf.read(1)?[0])?;
                            let len = self.checked_container_size(self.read_i32_raw()?)? as u32;
                            current = SkipState::Collection(len * 2, [key_type, value_type]);
                            continue;
                        }
                        TType::Struct => unreachable!("handled above"),
                        TType::Stop => {
                            return Err(Error::invalid_data("unexpected stop ttype in skip"))
                        }
                    }
                    current = match stack.pop() {
                        Some(next) => next,
                        None => break,
                    };
                }
                SkipState::Collection(0, _) => {
                    current = match stack.pop() {
                        Some(next) => next,
                        None => break,
                    };
                }
                SkipState::Collection(remaining, ttypes) => {
                    let next_ttype = ttypes[(remaining & 1) as usize];
                    stack.push(SkipState::Collection(remaining - 1, ttypes));
                    current = SkipState::Value(next_ttype);
                }
            }
        }
        Ok(())
    }
}

/// A writer appending to a growable `WriteBuffer`. Always emits the strict
/// message envelope form.
pub struct TBinaryOutputProtocol {
    buf: WriteBuffer,
}

impl TBinaryOutputProtocol {
    pub fn new() -> Self {
        TBinaryOutputProtocol {
            buf: WriteBuffer::new(),
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.into_vec()
    }

    pub fn bytes(&self) -> &[u8] {
        self.buf.value()
    }
}

impl Default for TBinaryOutputProtocol {
    fn default() -> Self {
        TBinaryOutputProtocol::new()
    }
}

impl TOutputProtocol for TBinaryOutputProtocol {
    fn write_message_begin(&mut self, identifier: &TMessageIdentifier) -> Result<()> {
        let message_type: u8 = identifier.message_type.into();
        let header = VERSION_1 | message_type as i32;
        self.write_i32(header)?;
        self.write_string(&identifier.name)?;
        self.write_i32(identifier.sequence_number)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_begin(&mut self, identifier: &TFieldIdentifier) -> Result<()> {
        self.write_byte(identifier.field_type.into())?;
        match identifier.id {
            Some(id) => self.write_i16(id),
            None => Ok(()),
        }
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<()> {
        self.write_byte(TType::Stop.into())
    }

    fn write_list_begin(&mut self, identifier: &TListIdentifier) -> Result<()> {
        self.write_byte(identifier.element_type.into())?;
        self.write_i32(identifier.size as i32)
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, identifier: &TSetIdentifier) -> Result<()> {
        self.write_byte(identifier.element_type.into())?;
        self.write_i32(identifier.size as i32)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, identifier: &TMapIdentifier) -> Result<()> {
        self.write_byte(identifier.key_type.into())?;
        self.write_byte(identifier.value_type.into())?;
        self.write_i32(identifier.size as i32)
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, b: bool) -> Result<()> {
        self.write_byte(if b { 1 } else { 0 })
    }

    fn write_byte(&mut self, b: i8) -> Result<()> {
        self.buf.write(&[b as u8]);
        Ok(())
    }

    fn write_i16(&mut self, i: i16) -> Result<()> {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, i);
        self.buf.write(&bytes);
        Ok(())
    }

    fn write_i32(&mut self, i: i32) -> Result<()> {
        let mut bytes = [0u8; 4];
        BigEndian::write_i32(&mut bytes, i);
        self.buf.write(&bytes);
        Ok(())
    }

    fn write_i64(&mut self, i: i64) -> Result<()> {
        let mut bytes = [0u8; 8];
        BigEndian::write_i64(&mut bytes, i);
        self.buf.write(&bytes);
        Ok(())
    }

    fn write_double(&mut self, d: f64) -> Result<()> {
        let mut bytes = [0u8; 8];
        BigEndian::write_f64(&mut bytes, d);
        self.buf.write(&bytes);
        Ok(())
    }

    fn write_binary(&mut self, b: &[u8]) -> Result<()> {
        self.write_i32(b.len() as i32)?;
        self.buf.write(b);
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_binary(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_message(name: &str, message_type: TMessageType, seqid: i32) -> Vec<u8> {
        let mut out = TBinaryOutputProtocol::new();
        out.write_message_begin(&TMessageIdentifier::new(name, message_type, seqid))
            .unwrap();
        out.write_message_end().unwrap();
        out.into_vec()
    }

    #[test]
    fn writes_strict_message_envelope() {
        let bytes = roundtrip_message("getFoo", TMessageType::Call, 10);
        assert_eq!(&bytes[0..4], &[0x80, 0x01, 0x00, 0x01]);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x06]);
        assert_eq!(&bytes[8..14], b"getFoo");
        assert_eq!(&bytes[14..18], &[0x00, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn reads_back_strict_message_envelope() {
        let bytes = roundtrip_message("getFoo", TMessageType::Call, 10);
        let mut input = TBinaryInputProtocol::new(&bytes);
        let id = input.read_message_begin().unwrap();
        assert_eq!(id.name.as_str(), "getFoo");
        assert_eq!(id.message_type, TMessageType::Call);
        assert_eq!(id.sequence_number, 10);
    }

    #[test]
    fn reads_non_strict_message_envelope() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&6i32.to_be_bytes());
        bytes.extend_from_slice(b"getFoo");
        bytes.push(1); // CALL
        bytes.extend_from_slice(&10i32.to_be_bytes());

        let mut input = TBinaryInputProtocol::new(&bytes);
        let id = input.read_message_begin().unwrap();
        assert_eq!(id.name.as_str(), "getFoo");
        assert_eq!(id.message_type, TMessageType::Call);
        assert_eq!(id.sequence_number, 10);
    }

    #[test]
    fn rejects_bad_strict_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(0x8002_0001u32 as i32).to_be_bytes());
        let mut input = TBinaryInputProtocol::new(&bytes);
        assert!(input.read_message_begin().is_err());
    }

    #[test]
    fn accepts_every_strict_message_type_byte() {
        for message_type in [TMessageType::Call, TMessageType::Reply, TMessageType::OneWay] {
            let bytes = roundtrip_message("getFoo", message_type, 10);
            let mut input = TBinaryInputProtocol::new(&bytes);
            let id = input.read_message_begin().unwrap();
            assert_eq!(id.message_type, message_type);
        }
    }

    #[test]
    fn i32_65537_round_trips() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_i32(65537).unwrap();
        let bytes = out.into_vec();
        assert_eq!(bytes, vec![0x00, 0x01, 0x00, 0x01]);

        let mut input = TBinaryInputProtocol::new(&bytes);
        assert_eq!(input.read_i32().unwrap(), 65537);
    }

    #[test]
    fn struct_field_round_trips() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_struct_begin().unwrap();
        out.write_field_begin(&TFieldIdentifier::new(TType::Binary, Some(1)))
            .unwrap();
        out.write_string("hello").unwrap();
        out.write_field_end().unwrap();
        out.write_field_stop().unwrap();
        out.write_struct_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        input.read_struct_begin().unwrap();
        let field = input.read_field_begin().unwrap();
        assert_eq!(field.field_type, TType::Binary);
        assert_eq!(field.id, Some(1));
        assert_eq!(input.read_string().unwrap(), "hello");
        input.read_field_end().unwrap();
        let stop = input.read_field_begin().unwrap();
        assert!(stop.is_stop());
        input.read_struct_end().unwrap();
    }

    #[test]
    fn list_of_strings_round_trips() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_list_begin(&TListIdentifier::new(TType::Binary, 2))
            .unwrap();
        out.write_string("a").unwrap();
        out.write_string("b").unwrap();
        out.write_list_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        let list = input.read_list_begin().unwrap();
        assert_eq!(list.element_type, TType::Binary);
        assert_eq!(list.size, 2);
        assert_eq!(input.read_string().unwrap(), "a");
        assert_eq!(input.read_string().unwrap(), "b");
        input.read_list_end().unwrap();
    }

    #[test]
    fn skip_unknown_struct_field() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_struct_begin().unwrap();
        out.write_field_begin(&TFieldIdentifier::new(TType::List, Some(2)))
            .unwrap();
        out.write_list_begin(&TListIdentifier::new(TType::I32, 3))
            .unwrap();
        out.write_i32(1).unwrap();
        out.write_i32(2).unwrap();
        out.write_i32(3).unwrap();
        out.write_list_end().unwrap();
        out.write_field_end().unwrap();
        out.write_field_begin(&TFieldIdentifier::new(TType::I32, Some(1)))
            .unwrap();
        out.write_i32(42).unwrap();
        out.write_field_end().unwrap();
        out.write_field_stop().unwrap();
        out.write_struct_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        input.read_struct_begin().unwrap();
        let first = input.read_field_begin().unwrap();
        assert_eq!(first.field_type, TType::List);
        input.skip(TType::List).unwrap();
        input.read_field_end().unwrap();

        let second = input.read_field_begin().unwrap();
        assert_eq!(second.id, Some(1));
        assert_eq!(input.read_i32().unwrap(), 42);
        input.read_field_end().unwrap();

        let stop = input.read_field_begin().unwrap();
        assert!(stop.is_stop());
        input.read_struct_end().unwrap();
    }

    #[test]
    fn skip_nested_struct_in_list() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_list_begin(&TListIdentifier::new(TType::Struct, 2))
            .unwrap();
        for i in 0..2 {
            out.write_struct_begin().unwrap();
            out.write_field_begin(&TFieldIdentifier::new(TType::I32, Some(1)))
                .unwrap();
            out.write_i32(i).unwrap();
            out.write_field_end().unwrap();
            out.write_field_stop().unwrap();
            out.write_struct_end().unwrap();
        }
        out.write_list_end().unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        input.read_list_begin().unwrap();
        input.skip(TType::Struct).unwrap();
        input.skip(TType::Struct).unwrap();
        input.read_list_end().unwrap();
        assert_eq!(input.buf.available(), 0);
    }

    #[test]
    fn skip_rejects_a_stop_byte_as_a_list_element_type() {
        let mut bytes = Vec::new();
        bytes.push(TType::Stop as u8); // element type byte, invalid
        bytes.extend_from_slice(&1i32.to_be_bytes()); // size

        let mut input = TBinaryInputProtocol::new(&bytes);
        assert!(input.skip(TType::List).is_err());
    }

    #[test]
    fn container_size_limit_is_enforced() {
        let mut out = TBinaryOutputProtocol::new();
        out.write_list_begin(&TListIdentifier::new(TType::I32, 4))
            .unwrap();
        let bytes = out.into_vec();

        let limits = Limits {
            max_container_size: Some(2),
            ..Limits::default()
        };
        let mut input = TBinaryInputProtocol::with_limits(&bytes, limits);
        assert!(input.read_list_begin().is_err());
    }
}
