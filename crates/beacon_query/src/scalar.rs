use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde_json::{Number, Value};

use crate::errors::{QueryError, Result};

/// Wire format for timestamps. Microsecond precision, no timezone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A literal value used in select literals and filter bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Utf8(String),
    Int64(i64),
    Float64(f64),
    Boolean(bool),
    /// A naive timestamp. Timezone aware inputs are converted to UTC on the
    /// way in.
    Timestamp(NaiveDateTime),
}

impl Scalar {
    /// Serialize to the wire representation.
    ///
    /// Errors if the value can't be represented without losing information.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::Utf8(s) => Value::String(s.clone()),
            Self::Int64(v) => Value::Number((*v).into()),
            Self::Float64(v) => Number::from_f64(*v).map(Value::Number).ok_or_else(|| {
                QueryError::Serialization(format!("Non-finite float '{v}' cannot be sent as JSON"))
            })?,
            Self::Boolean(v) => Value::Bool(*v),
            Self::Timestamp(ts) => Value::String(format_timestamp(ts)?),
        })
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.ffffff`.
pub fn format_timestamp(ts: &NaiveDateTime) -> Result<String> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(QueryError::Serialization(format!(
            "Timestamp '{ts}' has a year outside 0..=9999"
        )));
    }
    // Leap seconds are stored as nanos >= 1_000_000_000.
    let nanos = ts.nanosecond();
    if nanos >= 1_000_000_000 {
        return Err(QueryError::Serialization(format!(
            "Timestamp '{ts}' is a leap second"
        )));
    }
    if nanos % 1_000 != 0 {
        return Err(QueryError::Serialization(format!(
            "Timestamp '{ts}' has sub-microsecond precision"
        )));
    }
    Ok(ts.format(TIMESTAMP_FORMAT).to_string())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8(s) => write!(f, "'{s}'"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Self::Int64(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Self::Float64(value as f64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Self::Timestamp(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Scalar {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.naive_utc())
    }
}
