//! The eight built-in primitive specs. Logically singletons (SPEC_FULL.md
//! §3.3) but cheap enough to construct fresh — there's no interior state
//! to share, so no registry is needed to make that true in practice.

use serde_json::{Number, Value as Primitive};

use crate::error::{Error, Result};
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::ttype::TType;
use crate::value::{Name, Value};
use crate::spec::TypeSpec;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Binary,
    String,
}

#[derive(Debug)]
pub struct PrimitiveTypeSpec {
    kind: Kind,
}

impl PrimitiveTypeSpec {
    fn new(kind: Kind) -> TypeSpec {
        TypeSpec::Primitive(std::rc::Rc::new(PrimitiveTypeSpec { kind }))
    }

    pub fn bool() -> TypeSpec {
        Self::new(Kind::Bool)
    }
    pub fn byte() -> TypeSpec {
        Self::new(Kind::Byte)
    }
    pub fn i16() -> TypeSpec {
        Self::new(Kind::I16)
    }
    pub fn i32() -> TypeSpec {
        Self::new(Kind::I32)
    }
    pub fn i64() -> TypeSpec {
        Self::new(Kind::I64)
    }
    pub fn double() -> TypeSpec {
        Self::new(Kind::Double)
    }
    pub fn binary() -> TypeSpec {
        Self::new(Kind::Binary)
    }
    pub fn string() -> TypeSpec {
        Self::new(Kind::String)
    }

    pub fn name(&self) -> Name {
        Name::new(match self.kind {
            Kind::Bool => "bool",
            Kind::Byte => "byte",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Double => "double",
            Kind::Binary => "binary",
            Kind::String => "string",
        })
    }

    pub fn ttype(&self) -> TType {
        match self.kind {
            Kind::Bool => TType::Bool,
            Kind::Byte => TType::Byte,
            Kind::I16 => TType::I16,
            Kind::I32 => TType::I32,
            Kind::I64 => TType::I64,
            Kind::Double => TType::Double,
            Kind::Binary | Kind::String => TType::Binary,
        }
    }

    pub fn read_from(&self, reader: &mut dyn TInputProtocol) -> Result<Value> {
        Ok(match self.kind {
            Kind::Bool => Value::Bool(reader.read_bool()?),
            Kind::Byte => Value::Byte(reader.read_byte()?),
            Kind::I16 => Value::I16(reader.read_i16()?),
            Kind::I32 => Value::I32(reader.read_i32()?),
            Kind::I64 => Value::I64(reader.read_i64()?),
            Kind::Double => Value::Double(reader.read_double()?),
            Kind::Binary => Value::Binary(reader.read_binary()?),
            Kind::String => Value::Binary(reader.read_string()?.into_bytes()),
        })
    }

    pub fn write_to(&self, writer: &mut dyn TOutputProtocol, value: &Value) -> Result<()> {
        match (self.kind, value) {
            (Kind::Bool, Value::Bool(b)) => writer.write_bool(*b),
            (Kind::Byte, Value::Byte(b)) => writer.write_byte(*b),
            (Kind::I16, Value::I16(i)) => writer.write_i16(*i),
            (Kind::I32, Value::I32(i)) => writer.write_i32(*i),
            (Kind::I64, Value::I64(i)) => writer.write_i64(*i),
            (Kind::Double, Value::Double(d)) => writer.write_double(*d),
            (Kind::Binary, Value::Binary(b)) => writer.write_binary(b),
            (Kind::String, Value::Binary(b)) => {
                let s = std::str::from_utf8(b)
                    .map_err(|_| Error::invalid_data("not a valid utf8 string"))?;
                writer.write_string(s)
            }
            _ => Err(Error::type_mismatch(format!(
                "expected a {} value for {}",
                self.ttype(),
                self.name()
            ))),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        match (self.kind, value) {
            (Kind::Bool, Value::Bool(_)) => Ok(()),
            (Kind::Byte, Value::Byte(_)) => Ok(()),
            (Kind::I16, Value::I16(_)) => Ok(()),
            (Kind::I32, Value::I32(_)) => Ok(()),
            (Kind::I64, Value::I64(_)) => Ok(()),
            (Kind::Double, Value::Double(_)) => Ok(()),
            (Kind::Binary, Value::Binary(_)) => Ok(()),
            (Kind::String, Value::Binary(b)) => std::str::from_utf8(b)
                .map(|_| ())
                .map_err(|_| Error::invalid_data("not a valid utf8 string")),
            _ => Err(Error::type_mismatch(format!(
                "expected a {} value for {}",
                self.ttype(),
                self.name()
            ))),
        }
    }

    pub fn to_primitive(&self, value: &Value) -> Result<Primitive> {
        self.validate(value)?;
        Ok(match (self.kind, value) {
            (Kind::Bool, Value::Bool(b)) => Primitive::Bool(*b),
            (Kind::Byte, Value::Byte(b)) => Primitive::Number((*b as i64).into()),
            (Kind::I16, Value::I16(i)) => Primitive::Number((*i as i64).into()),
            (Kind::I32, Value::I32(i)) => Primitive::Number((*i as i64).into()),
            (Kind::I64, Value::I64(i)) => Primitive::Number((*i).into()),
            (Kind::Double, Value::Double(d)) => Number::from_f64(*d)
                .map(Primitive::Number)
                .unwrap_or(Primitive::Null),
            (Kind::Binary, Value::Binary(b)) => {
                Primitive::Array(b.iter().map(|byte| Primitive::Number((*byte).into())).collect())
            }
            (Kind::String, Value::Binary(b)) => {
                let s = std::str::from_utf8(b)
                    .map_err(|_| Error::invalid_data("not a valid utf8 string"))?;
                Primitive::String(s.to_owned())
            }
            _ => unreachable!("validate already rejected mismatched variants"),
        })
    }

    pub fn from_primitive(&self, primitive: &Primitive) -> Result<Value> {
        let value = match self.kind {
            Kind::Bool => Value::Bool(primitive_as_bool(primitive)?),
            Kind::Byte => Value::Byte(primitive_as_i64(primitive)?.try_into().map_err(|_| {
                Error::out_of_range(format!("{} does not fit in a byte", primitive))
            })?),
            Kind::I16 => Value::I16(primitive_as_i64(primitive)?.try_into().map_err(|_| {
                Error::out_of_range(format!("{} does not fit in an i16", primitive))
            })?),
            Kind::I32 => Value::I32(primitive_as_i64(primitive)?.try_into().map_err(|_| {
                Error::out_of_range(format!("{} does not fit in an i32", primitive))
            })?),
            Kind::I64 => Value::I64(primitive_as_i64(primitive)?),
            Kind::Double => Value::Double(primitive_as_f64(primitive)?),
            Kind::Binary => Value::Binary(primitive_as_bytes(primitive)?),
            Kind::String => Value::Binary(primitive_as_bytes(primitive)?),
        };
        self.validate(&value)?;
        Ok(value)
    }
}

fn primitive_as_bool(p: &Primitive) -> Result<bool> {
    p.as_bool()
        .or_else(|| p.as_i64().map(|n| n != 0))
        .ok_or_else(|| Error::type_mismatch(format!("{p} is not a bool")))
}

fn primitive_as_i64(p: &Primitive) -> Result<i64> {
    p.as_i64()
        .ok_or_else(|| Error::type_mismatch(format!("{p} is not an integer")))
}

fn primitive_as_f64(p: &Primitive) -> Result<f64> {
    p.as_f64()
        .ok_or_else(|| Error::type_mismatch(format!("{p} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{TBinaryInputProtocol, TBinaryOutputProtocol};

    #[test]
    fn string_write_and_read_round_trip() {
        let spec = match PrimitiveTypeSpec::string() {
            TypeSpec::Primitive(p) => p,
            _ => unreachable!(),
        };
        let mut out = TBinaryOutputProtocol::new();
        spec.write_to(&mut out, &Value::Binary(b"hello".to_vec())).unwrap();
        let bytes = out.into_vec();

        let mut input = TBinaryInputProtocol::new(&bytes);
        assert_eq!(spec.read_from(&mut input).unwrap(), Value::Binary(b"hello".to_vec()));
    }

    #[test]
    fn string_write_rejects_invalid_utf8() {
        let spec = match PrimitiveTypeSpec::string() {
            TypeSpec::Primitive(p) => p,
            _ => unreachable!(),
        };
        let mut out = TBinaryOutputProtocol::new();
        let err = spec.write_to(&mut out, &Value::Binary(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::InvalidData));
    }

    #[test]
    fn i32_out_of_range_from_primitive_errors() {
        let spec = match PrimitiveTypeSpec::i32() {
            TypeSpec::Primitive(p) => p,
            _ => unreachable!(),
        };
        let err = spec.from_primitive(&Primitive::from(i64::MAX)).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::OutOfRange));
    }

    #[test]
    fn validate_rejects_mismatched_variant() {
        let spec = match PrimitiveTypeSpec::bool() {
            TypeSpec::Primitive(p) => p,
            _ => unreachable!(),
        };
        let err = spec.validate(&Value::I32(1)).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::TypeMismatch));
    }
}

fn primitive_as_bytes(p: &Primitive) -> Result<Vec<u8>> {
    match p {
        Primitive::String(s) => Ok(s.clone().into_bytes()),
        Primitive::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .filter(|n| *n <= u8::MAX as u64)
                    .map(|n| n as u8)
                    .ok_or_else(|| Error::type_mismatch(format!("{item} is not a byte")))
            })
            .collect(),
        _ => Err(Error::type_mismatch(format!("{p} is not text or a byte array"))),
    }
}
