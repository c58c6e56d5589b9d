use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;

/// Resolution of a datetime dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Microsecond => "us",
            Self::Nanosecond => "ns",
        }
    }
}

/// Client side dtype tag, named after the usual numpy dtype names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Datetime(TimeUnit),
    Str,
    Bool,
    Complex64,
    Complex128,
    Bytes,
    Object,
}

/// Broad grouping of dtypes used when picking a wire type for a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DTypeFamily {
    Integer,
    Floating,
    Datetime,
    String,
    Boolean,
    Complex,
    Binary,
    Object,
}

impl DType {
    pub fn family(&self) -> DTypeFamily {
        match self {
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32
            | Self::UInt64 => DTypeFamily::Integer,
            Self::Float16 | Self::Float32 | Self::Float64 => DTypeFamily::Floating,
            Self::Datetime(_) => DTypeFamily::Datetime,
            Self::Str => DTypeFamily::String,
            Self::Bool => DTypeFamily::Boolean,
            Self::Complex64 | Self::Complex128 => DTypeFamily::Complex,
            Self::Bytes => DTypeFamily::Binary,
            Self::Object => DTypeFamily::Object,
        }
    }

    /// Name of the arrow type the engine casts to for this dtype.
    ///
    /// Only integer, floating, datetime and string dtypes can be cast.
    pub fn wire_type_name(&self) -> Result<&'static str, QueryError> {
        match self.family() {
            DTypeFamily::Integer => Ok("Int64"),
            DTypeFamily::Floating => Ok("Float64"),
            DTypeFamily::Datetime => Ok("Timestamp(Nanosecond, None)"),
            DTypeFamily::String => Ok("Utf8"),
            _ => Err(QueryError::UnsupportedType(format!(
                "Cannot cast to dtype '{self}', expected an integer, floating, datetime or string dtype"
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Datetime(TimeUnit::Second) => "datetime64[s]",
            Self::Datetime(TimeUnit::Millisecond) => "datetime64[ms]",
            Self::Datetime(TimeUnit::Microsecond) => "datetime64[us]",
            Self::Datetime(TimeUnit::Nanosecond) => "datetime64[ns]",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Bytes => "bytes",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_lowercase().as_str() {
            "int8" | "i1" => Self::Int8,
            "int16" | "i2" => Self::Int16,
            "int32" | "i4" => Self::Int32,
            "int64" | "i8" | "int" => Self::Int64,
            "uint8" | "u1" => Self::UInt8,
            "uint16" | "u2" => Self::UInt16,
            "uint32" | "u4" => Self::UInt32,
            "uint64" | "u8" => Self::UInt64,
            "float16" | "f2" => Self::Float16,
            "float32" | "f4" => Self::Float32,
            "float64" | "f8" | "float" => Self::Float64,
            "datetime64[s]" => Self::Datetime(TimeUnit::Second),
            "datetime64[ms]" => Self::Datetime(TimeUnit::Millisecond),
            "datetime64[us]" => Self::Datetime(TimeUnit::Microsecond),
            "datetime64" | "datetime64[ns]" => Self::Datetime(TimeUnit::Nanosecond),
            "str" | "str_" | "string" | "unicode" | "u" => Self::Str,
            "bool" | "bool_" | "?" => Self::Bool,
            "complex64" | "c8" => Self::Complex64,
            "complex128" | "c16" | "complex" => Self::Complex128,
            "bytes" | "bytes_" | "s" => Self::Bytes,
            "object" | "o" => Self::Object,
            other => {
                return Err(QueryError::UnsupportedType(format!(
                    "Unknown dtype '{other}'"
                )));
            }
        };
        Ok(ty)
    }
}
