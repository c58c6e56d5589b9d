use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::debug;
use zarrs::array::{ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;

use crate::errors::{ClientError, Result};
use crate::materialize::dataset::{Attribute, Dataset, FILL_VALUE_ATTR, Values, Variable};

fn zarr_err(e: impl std::fmt::Display) -> ClientError {
    ClientError::Zarr(e.to_string())
}

fn number(v: f64) -> Value {
    // JSON has no NaN/inf; zarr metadata spells them as strings.
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        None if v.is_nan() => Value::String("NaN".to_string()),
        None if v > 0.0 => Value::String("Infinity".to_string()),
        None => Value::String("-Infinity".to_string()),
    }
}

fn attribute_json(value: &Values) -> Value {
    let mut items: Vec<Value> = match value {
        Values::I8(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::U8(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::I16(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::U16(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::I32(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::U32(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::I64(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::U64(v) => v.iter().map(|x| (*x).into()).collect(),
        Values::F32(v) => v.iter().map(|x| number(f64::from(*x))).collect(),
        Values::F64(v) => v.iter().map(|x| number(*x)).collect(),
        Values::Text(v) => v.iter().map(|x| Value::String(x.clone())).collect(),
    };
    if items.len() == 1 {
        items.remove(0)
    } else {
        Value::Array(items)
    }
}

fn attributes_json<'a>(attrs: impl IntoIterator<Item = &'a Attribute>) -> Map<String, Value> {
    attrs
        .into_iter()
        .map(|a| (a.name.clone(), attribute_json(&a.value)))
        .collect()
}

/// Zarr data type and fill value for a variable.
///
/// The fill value is taken from `_FillValue` when present. `_FillValue`
/// itself isn't repeated in the array attributes.
fn array_type(var: &Variable) -> (DataType, FillValue) {
    let fill = var.attribute(FILL_VALUE_ATTR);

    macro_rules! typed {
        ($dtype:ident, $variant:ident, $default:expr) => {{
            let v = match fill {
                Some(Values::$variant(f)) if !f.is_empty() => f[0],
                _ => $default,
            };
            (DataType::$dtype, FillValue::from(v))
        }};
    }

    match &var.data {
        Values::I8(_) => typed!(Int8, I8, 0i8),
        Values::U8(_) => typed!(UInt8, U8, 0u8),
        Values::I16(_) => typed!(Int16, I16, 0i16),
        Values::U16(_) => typed!(UInt16, U16, 0u16),
        Values::I32(_) => typed!(Int32, I32, 0i32),
        Values::U32(_) => typed!(UInt32, U32, 0u32),
        Values::I64(_) => typed!(Int64, I64, 0i64),
        Values::U64(_) => typed!(UInt64, U64, 0u64),
        Values::F32(_) => typed!(Float32, F32, f32::NAN),
        Values::F64(_) => typed!(Float64, F64, f64::NAN),
        Values::Text(_) => (DataType::String, FillValue::from("")),
    }
}

/// Write a dataset as a zarr hierarchy rooted at `path`, one array per
/// variable in a single chunk.
pub fn write_dataset(ds: &Dataset, path: &Path) -> Result<()> {
    let store = Arc::new(FilesystemStore::new(path).map_err(zarr_err)?);

    let group = GroupBuilder::new()
        .attributes(attributes_json(&ds.attributes))
        .build(store.clone(), "/")
        .map_err(zarr_err)?;
    group.store_metadata().map_err(zarr_err)?;

    for var in &ds.variables {
        if var.name.is_empty() {
            // Would map onto the root group.
            return Err(ClientError::Materialize {
                column: var.name.clone(),
                reason: "empty variable name".to_string(),
            });
        }
        let shape: Vec<u64> = var
            .dims
            .iter()
            .map(|d| {
                ds.dim_len(d)
                    .map(|len| len as u64)
                    .ok_or_else(|| zarr_err(format!("unknown dimension '{d}'")))
            })
            .collect::<Result<_>>()?;
        // Chunk extents must be non-zero, even for empty arrays.
        let chunk_shape: Vec<u64> = shape.iter().map(|len| (*len).max(1)).collect();
        let chunk_grid: ChunkGrid = chunk_shape.try_into().map_err(zarr_err)?;

        let (data_type, fill_value) = array_type(var);
        let attrs = attributes_json(var.attributes.iter().filter(|a| a.name != FILL_VALUE_ATTR));
        let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();
        let array_path = format!("/{}", var.name.replace('/', "_"));

        let array = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value)
            .dimension_names(Some(dims))
            .attributes(attrs)
            .build(store.clone(), &array_path)
            .map_err(zarr_err)?;
        array.store_metadata().map_err(zarr_err)?;

        if shape.iter().product::<u64>() == 0 {
            continue;
        }
        let chunk = vec![0u64; shape.len()];
        match &var.data {
            Values::I8(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::U8(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::I16(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::U16(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::I32(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::U32(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::I64(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::U64(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::F32(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::F64(v) => array.store_chunk_elements(&chunk, v.as_slice()),
            Values::Text(v) => array.store_chunk_elements(&chunk, v.as_slice()),
        }
        .map_err(zarr_err)?;
        debug!(array = %array_path, "stored zarr array");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::dataset::{Dimension, INDEX_DIM};

    fn dataset(n: usize) -> Dataset {
        Dataset {
            dims: vec![Dimension {
                name: INDEX_DIM.to_string(),
                len: n,
            }],
            attributes: vec![Attribute::new("source", Values::text("beacon"))],
            variables: vec![
                Variable {
                    name: INDEX_DIM.to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: Vec::new(),
                    data: Values::I64((0..n as i64).collect()),
                },
                Variable {
                    name: "TEMP".to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: vec![Attribute::new(FILL_VALUE_ATTR, Values::F64(vec![f64::NAN]))],
                    data: Values::F64(vec![1.0; n]),
                },
            ],
        }
    }

    #[test]
    fn writes_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out.zarr");
        write_dataset(&dataset(3), &root).unwrap();

        assert!(root.join("zarr.json").is_file());
        assert!(root.join("TEMP").join("zarr.json").is_file());
        assert!(root.join("index").join("zarr.json").is_file());

        let meta: Value =
            serde_json::from_slice(&std::fs::read(root.join("TEMP").join("zarr.json")).unwrap())
                .unwrap();
        assert_eq!(serde_json::json!([3]), meta["shape"]);
        assert_eq!(serde_json::json!(["index"]), meta["dimension_names"]);
    }

    #[test]
    fn empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty.zarr");
        write_dataset(&dataset(0), &root).unwrap();
        assert!(root.join("TEMP").join("zarr.json").is_file());
    }

    #[test]
    fn rejects_empty_variable_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = dataset(2);
        ds.variables[1].name = String::new();

        let err = write_dataset(&ds, &dir.path().join("bad.zarr")).unwrap_err();
        assert!(matches!(err, ClientError::Materialize { .. }), "{err}");
    }

    #[test]
    fn nan_attributes() {
        assert_eq!(Value::String("NaN".to_string()), number(f64::NAN));
        assert_eq!(serde_json::json!([1, 2]), attribute_json(&Values::I32(vec![1, 2])));
        assert_eq!(serde_json::json!("x"), attribute_json(&Values::text("x")));
    }
}
