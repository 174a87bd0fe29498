use std::fmt;

use serde::Serialize;
use tvrt_contracts as contracts;

use crate::trace;

/// Source position of the generated code that called into the runtime.
///
/// Only used to annotate errors; `line == 0` means "no position".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SrcLoc<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl SrcLoc<'static> {
    pub const NONE: SrcLoc<'static> = SrcLoc { file: "", line: 0 };
}

impl<'a> SrcLoc<'a> {
    pub const fn new(file: &'a str, line: u32) -> SrcLoc<'a> {
        SrcLoc { file, line }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DivideByZero,
    ModuloByZero,
    ZeroStep,
    NumberToInteger,
    OutOfMemory,
    /// A size hint larger than any table the host can hold.
    TableOverflow,
    InvalidArrayIndex,
    ArrayMetatable,
    TagCheck {
        expected: &'static str,
        received: &'static str,
        description: String,
    },
    Arity {
        function: String,
        expected: u32,
        received: u32,
    },
    StringLengthOverflow,
    CharOutOfRange,
    ToStringUnsupported {
        type_name: &'static str,
    },
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::DivideByZero => contracts::TVRT_ERR_DIVIDE_BY_ZERO,
            ErrorKind::ModuloByZero => contracts::TVRT_ERR_MODULO_BY_ZERO,
            ErrorKind::ZeroStep => contracts::TVRT_ERR_ZERO_STEP,
            ErrorKind::NumberToInteger => contracts::TVRT_ERR_NUMBER_TO_INTEGER,
            ErrorKind::OutOfMemory => contracts::TVRT_ERR_OUT_OF_MEMORY,
            ErrorKind::TableOverflow => contracts::TVRT_ERR_TABLE_OVERFLOW,
            ErrorKind::InvalidArrayIndex => contracts::TVRT_ERR_INVALID_ARRAY_INDEX,
            ErrorKind::ArrayMetatable => contracts::TVRT_ERR_ARRAY_METATABLE,
            ErrorKind::TagCheck { .. } => contracts::TVRT_ERR_TAG_CHECK,
            ErrorKind::Arity { .. } => contracts::TVRT_ERR_ARITY,
            ErrorKind::StringLengthOverflow => contracts::TVRT_ERR_STRING_LENGTH_OVERFLOW,
            ErrorKind::CharOutOfRange => contracts::TVRT_ERR_CHAR_OUT_OF_RANGE,
            ErrorKind::ToStringUnsupported { .. } => contracts::TVRT_ERR_TOSTRING_UNSUPPORTED,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::DivideByZero => "divide_by_zero",
            ErrorKind::ModuloByZero => "modulo_by_zero",
            ErrorKind::ZeroStep => "zero_step",
            ErrorKind::NumberToInteger => "number_to_integer",
            ErrorKind::OutOfMemory => "out_of_memory",
            ErrorKind::TableOverflow => "table_overflow",
            ErrorKind::InvalidArrayIndex => "invalid_array_index",
            ErrorKind::ArrayMetatable => "array_metatable",
            ErrorKind::TagCheck { .. } => "tag_check",
            ErrorKind::Arity { .. } => "arity",
            ErrorKind::StringLengthOverflow => "string_length_overflow",
            ErrorKind::CharOutOfRange => "char_out_of_range",
            ErrorKind::ToStringUnsupported { .. } => "tostring_unsupported",
        }
    }

    /// Allocator exhaustion cannot be caught by generated code.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::OutOfMemory)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DivideByZero => f.write_str("attempt to divide by zero"),
            ErrorKind::ModuloByZero => f.write_str("attempt to perform 'n%0'"),
            ErrorKind::ZeroStep => f.write_str("'for' step is zero"),
            ErrorKind::NumberToInteger => {
                f.write_str("conversion from float does not fit into integer")
            }
            ErrorKind::OutOfMemory => f.write_str("not enough memory"),
            ErrorKind::TableOverflow => f.write_str("table overflow"),
            ErrorKind::InvalidArrayIndex => f.write_str("invalid index for array"),
            ErrorKind::ArrayMetatable => f.write_str("arrays must not have a metatable"),
            ErrorKind::TagCheck {
                expected,
                received,
                description,
            } => write!(
                f,
                "wrong type for {description}, expected {expected} but found {received}"
            ),
            ErrorKind::Arity {
                function,
                expected,
                received,
            } => write!(
                f,
                "wrong number of arguments to function '{function}', \
                 expected {expected} but received {received}"
            ),
            ErrorKind::StringLengthOverflow => f.write_str("string length overflow"),
            ErrorKind::CharOutOfRange => f.write_str("char value out of range"),
            ErrorKind::ToStringUnsupported { type_name } => {
                write!(f, "tostring called with unsuported type '{type_name}'")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub file: Option<String>,
    pub line: u32,
}

#[derive(Serialize)]
struct DiagReport<'a> {
    schema_version: &'static str,
    code: u32,
    kind: &'static str,
    message: String,
    file: Option<&'a str>,
    line: Option<u32>,
    fatal: bool,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, loc: SrcLoc<'_>) -> RuntimeError {
        let (file, line) = if loc.line > 0 {
            (Some(loc.file.to_string()), loc.line)
        } else {
            (None, 0)
        };
        let err = RuntimeError { kind, file, line };
        trace::error_raised(&err);
        err
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn to_diag_json(&self) -> serde_json::Value {
        let report = DiagReport {
            schema_version: contracts::TVRT_DIAG_SCHEMA_VERSION,
            code: self.code(),
            kind: self.kind.name(),
            message: self.kind.to_string(),
            file: self.file.as_deref(),
            line: (self.line > 0).then_some(self.line),
            fatal: self.is_fatal(),
        };
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "file {file}: line {}: ", self.line)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for RuntimeError {}
