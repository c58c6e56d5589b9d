//! Array dataset built from a tabular result.
//!
//! Every column becomes a one dimensional variable over the `index`
//! dimension, the same layout a dataframe-to-array conversion produces.

use arrow::array::{Array, ArrayRef, ArrowPrimitiveType, AsArray, PrimitiveArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    TimeUnit, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};

use crate::errors::{ClientError, Result};
use crate::materialize::frame::DataFrame;

pub const INDEX_DIM: &str = "index";

pub const FILL_VALUE_ATTR: &str = "_FillValue";

// NetCDF default fill values.
pub const FILL_BYTE: i8 = -127;
pub const FILL_SHORT: i16 = -32767;
pub const FILL_INT: i32 = -2147483647;
pub const FILL_INT64: i64 = -9223372036854775806;
pub const FILL_UBYTE: u8 = 255;
pub const FILL_USHORT: u16 = 65535;
pub const FILL_UINT: u32 = 4294967295;
pub const FILL_UINT64: u64 = 18446744073709551614;

/// Typed values of a variable or attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Text(Vec<String>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(vec![s.into()])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Values,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Values) -> Self {
        Attribute {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub data: Values,
}

impl Variable {
    pub fn attribute(&self, name: &str) -> Option<&Values> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub dims: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub variables: Vec<Variable>,
}

impl Dataset {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|d| d.name == name).map(|d| d.len)
    }

    /// Build a dataset from a frame, one variable per column plus an `index`
    /// coordinate.
    pub fn from_frame(frame: &DataFrame) -> Result<Self> {
        let num_rows = frame.num_rows();

        let mut variables = Vec::with_capacity(frame.num_columns() + 1);
        variables.push(Variable {
            name: INDEX_DIM.to_string(),
            dims: vec![INDEX_DIM.to_string()],
            attributes: Vec::new(),
            data: Values::I64((0..num_rows as i64).collect()),
        });

        for field in frame.schema().fields() {
            if field.name() == INDEX_DIM {
                return Err(ClientError::Materialize {
                    column: field.name().clone(),
                    reason: "name collides with the index dimension".to_string(),
                });
            }
            if field.name().is_empty() {
                return Err(ClientError::Materialize {
                    column: String::new(),
                    reason: "empty column name".to_string(),
                });
            }
            let array = frame.column(field.name())?;
            let (data, attributes) = column_values(field, &array)?;
            variables.push(Variable {
                name: field.name().clone(),
                dims: vec![INDEX_DIM.to_string()],
                attributes,
                data,
            });
        }

        Ok(Dataset {
            dims: vec![Dimension {
                name: INDEX_DIM.to_string(),
                len: num_rows,
            }],
            attributes: Vec::new(),
            variables,
        })
    }
}

fn with_fill<T>(array: &PrimitiveArray<T>, fill: T::Native) -> Vec<T::Native>
where
    T: ArrowPrimitiveType,
{
    array.iter().map(|v| v.unwrap_or(fill)).collect()
}

fn time_unit_name(unit: &TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Second => "seconds",
        TimeUnit::Millisecond => "milliseconds",
        TimeUnit::Microsecond => "microseconds",
        TimeUnit::Nanosecond => "nanoseconds",
    }
}

/// Convert one arrow column into typed values plus encoding attributes.
///
/// Nulls become NaN for floats and the NetCDF default fill value (recorded in
/// `_FillValue`) for integers.
fn column_values(field: &Field, array: &ArrayRef) -> Result<(Values, Vec<Attribute>)> {
    let has_nulls = array.null_count() > 0;
    let mut attrs = Vec::new();

    macro_rules! int_column {
        ($arrow_ty:ty, $variant:ident, $fill:expr) => {{
            if has_nulls {
                attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::$variant(vec![$fill])));
            }
            Values::$variant(with_fill(array.as_primitive::<$arrow_ty>(), $fill))
        }};
    }

    let values = match field.data_type() {
        DataType::Int8 => int_column!(Int8Type, I8, FILL_BYTE),
        DataType::Int16 => int_column!(Int16Type, I16, FILL_SHORT),
        DataType::Int32 => int_column!(Int32Type, I32, FILL_INT),
        DataType::Int64 => int_column!(Int64Type, I64, FILL_INT64),
        DataType::UInt8 => int_column!(UInt8Type, U8, FILL_UBYTE),
        DataType::UInt16 => int_column!(UInt16Type, U16, FILL_USHORT),
        DataType::UInt32 => int_column!(UInt32Type, U32, FILL_UINT),
        DataType::UInt64 => int_column!(UInt64Type, U64, FILL_UINT64),
        DataType::Float32 => {
            attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::F32(vec![f32::NAN])));
            Values::F32(with_fill(array.as_primitive::<Float32Type>(), f32::NAN))
        }
        DataType::Float64 => {
            attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::F64(vec![f64::NAN])));
            Values::F64(with_fill(array.as_primitive::<Float64Type>(), f64::NAN))
        }
        DataType::Boolean => {
            if has_nulls {
                attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::I8(vec![FILL_BYTE])));
            }
            attrs.push(Attribute::new("dtype", Values::text("bool")));
            Values::I8(
                array
                    .as_boolean()
                    .iter()
                    .map(|v| v.map(i8::from).unwrap_or(FILL_BYTE))
                    .collect(),
            )
        }
        DataType::Utf8 => Values::Text(strings(array.as_string::<i32>().iter())),
        DataType::LargeUtf8 => Values::Text(strings(array.as_string::<i64>().iter())),
        DataType::Utf8View => Values::Text(strings(array.as_string_view().iter())),
        DataType::Timestamp(unit, _) => {
            let ints = cast(array, &DataType::Int64)?;
            attrs.push(Attribute::new(
                "units",
                Values::text(format!("{} since 1970-01-01 00:00:00", time_unit_name(unit))),
            ));
            attrs.push(Attribute::new("calendar", Values::text("proleptic_gregorian")));
            if has_nulls {
                attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::I64(vec![FILL_INT64])));
            }
            Values::I64(with_fill(ints.as_primitive::<Int64Type>(), FILL_INT64))
        }
        DataType::Date32 => {
            let ints = cast(array, &DataType::Int32)?;
            attrs.push(Attribute::new("units", Values::text("days since 1970-01-01")));
            attrs.push(Attribute::new("calendar", Values::text("proleptic_gregorian")));
            if has_nulls {
                attrs.push(Attribute::new(FILL_VALUE_ATTR, Values::I32(vec![FILL_INT])));
            }
            Values::I32(with_fill(ints.as_primitive::<Int32Type>(), FILL_INT))
        }
        other => {
            return Err(ClientError::Materialize {
                column: field.name().clone(),
                reason: format!("unsupported data type {other}"),
            });
        }
    };

    Ok((values, attrs))
}

fn strings<'a>(iter: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    iter.map(|v| v.unwrap_or_default().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{
        BooleanArray, Float64Array, Int32Array, RecordBatch, StringArray,
        TimestampMicrosecondArray,
    };
    use arrow::datatypes::Schema;

    use super::*;

    fn frame() -> DataFrame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("DEPTH", DataType::Int32, true),
            Field::new("TEMP", DataType::Float64, true),
            Field::new("PLATFORM", DataType::Utf8, true),
            Field::new("GOOD", DataType::Boolean, true),
            Field::new("TIME", DataType::Timestamp(TimeUnit::Microsecond, None), false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![Some(5), None])),
                Arc::new(Float64Array::from(vec![Some(12.5), None])),
                Arc::new(StringArray::from(vec![Some("ARGO"), None])),
                Arc::new(BooleanArray::from(vec![Some(true), Some(false)])),
                Arc::new(TimestampMicrosecondArray::from(vec![0, 1_000_000])),
            ],
        )
        .unwrap();
        DataFrame::try_new(schema, vec![batch]).unwrap()
    }

    #[test]
    fn columns_to_variables() {
        let ds = Dataset::from_frame(&frame()).unwrap();
        assert_eq!(Some(2), ds.dim_len(INDEX_DIM));
        assert_eq!(Values::I64(vec![0, 1]), ds.variable("index").unwrap().data);

        let depth = ds.variable("DEPTH").unwrap();
        assert_eq!(Values::I32(vec![5, FILL_INT]), depth.data);
        assert_eq!(Some(&Values::I32(vec![FILL_INT])), depth.attribute(FILL_VALUE_ATTR));

        let Values::F64(temp) = &ds.variable("TEMP").unwrap().data else {
            panic!("expected f64 values");
        };
        assert_eq!(12.5, temp[0]);
        assert!(temp[1].is_nan());

        assert_eq!(
            Values::Text(vec!["ARGO".to_string(), String::new()]),
            ds.variable("PLATFORM").unwrap().data
        );
        assert_eq!(Values::I8(vec![1, 0]), ds.variable("GOOD").unwrap().data);

        let time = ds.variable("TIME").unwrap();
        assert_eq!(Values::I64(vec![0, 1_000_000]), time.data);
        assert_eq!(
            Some(&Values::text("microseconds since 1970-01-01 00:00:00")),
            time.attribute("units")
        );
    }

    #[test]
    fn unsupported_column_type() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "BLOB",
            DataType::Binary,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(arrow::array::BinaryArray::from(vec![b"ab".as_ref()]))],
        )
        .unwrap();
        let frame = DataFrame::try_new(schema, vec![batch]).unwrap();
        let err = Dataset::from_frame(&frame).unwrap_err();
        assert!(matches!(err, ClientError::Materialize { .. }), "{err}");
    }

    #[test]
    fn empty_column_name() {
        let schema = Arc::new(Schema::new(vec![Field::new("", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1]))])
                .unwrap();
        let frame = DataFrame::try_new(schema, vec![batch]).unwrap();
        let err = Dataset::from_frame(&frame).unwrap_err();
        assert!(
            matches!(err, ClientError::Materialize { ref reason, .. } if reason == "empty column name"),
            "{err}"
        );
    }
}
