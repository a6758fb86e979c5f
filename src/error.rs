use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

use crate::value::Value;

/// A single error type covering every failure mode in the compiler, linker,
/// bridge and binary codec.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn new<S: Into<Cow<'static, str>>>(kind: ErrorKind, message: S) -> Error {
        Error {
            message: message.into(),
            kind,
        }
    }

    pub const fn end_of_input() -> Error {
        Error {
            message: Cow::Borrowed("end of input"),
            kind: ErrorKind::EndOfInput,
        }
    }

    pub fn invalid_data<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::InvalidData, message)
    }

    pub fn unsupported_version<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::UnsupportedVersion, message)
    }

    pub fn unknown_exception(wire: Value) -> Error {
        Error::new(ErrorKind::UnknownException(Box::new(wire)), "unknown exception in reply")
    }

    pub fn compile<S: Into<Cow<'static, str>>>(message: S, lineno: Option<u32>) -> Error {
        Error::new(ErrorKind::Compile(lineno), message)
    }

    pub fn type_mismatch<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::TypeMismatch, message)
    }

    pub fn out_of_range<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::OutOfRange, message)
    }

    pub fn missing_required<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::MissingRequired, message)
    }

    pub fn size_limit<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::SizeLimit, message)
    }

    pub fn depth_limit<S: Into<Cow<'static, str>>>(message: S) -> Error {
        Error::new(ErrorKind::DepthLimit, message)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;

        write!(f, "{}", self.message)?;
        if !matches!(self.kind, InvalidData | UnsupportedVersion | NotImplemented) {
            write!(f, ", caused by {}", self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(value), "")
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    /// The reader requested more bytes than were available.
    EndOfInput,
    /// Malformed envelope or unknown ttype code during dispatch.
    InvalidData,
    /// A strict message envelope carried an unsupported version nibble.
    UnsupportedVersion,
    /// A function result carried an exception id neither `0` nor declared.
    UnknownException(Box<Value>),
    /// The IDL contradicts a compile-time constraint; carries the line number
    /// if one was available from the AST.
    Compile(Option<u32>),
    /// A host value's shape does not match its spec.
    TypeMismatch,
    /// An integral value did not fit its spec's declared width.
    OutOfRange,
    /// A required field was absent at construction or serialization time.
    MissingRequired,
    /// A configured `Limits` bound on container/string size was exceeded.
    SizeLimit,
    /// A configured `Limits` bound on recursion depth was exceeded.
    DepthLimit,
    NotImplemented,
    Io(std::io::Error),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::EndOfInput => write!(f, "EndOfInput"),
            ErrorKind::InvalidData => write!(f, "InvalidData"),
            ErrorKind::UnsupportedVersion => write!(f, "UnsupportedVersion"),
            ErrorKind::UnknownException(_) => write!(f, "UnknownException"),
            ErrorKind::Compile(lineno) => match lineno {
                Some(n) => write!(f, "CompileError(line {n})"),
                None => write!(f, "CompileError"),
            },
            ErrorKind::TypeMismatch => write!(f, "TypeMismatch"),
            ErrorKind::OutOfRange => write!(f, "OutOfRange"),
            ErrorKind::MissingRequired => write!(f, "MissingRequired"),
            ErrorKind::SizeLimit => write!(f, "SizeLimit"),
            ErrorKind::DepthLimit => write!(f, "DepthLimit"),
            ErrorKind::NotImplemented => write!(f, "NotImplemented"),
            ErrorKind::Io(e) => write!(f, "IOError: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
