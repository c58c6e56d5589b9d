use std::collections::HashMap;

use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use bytes::{Buf, Bytes};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use crate::errors::{ClientError, Result};
use crate::materialize::frame::DataFrame;

pub const DEFAULT_CRS: &str = "EPSG:4326";

const GEO_METADATA_KEY: &str = "geo";

const WKB_POINT: u32 = 1;

/// Column entry of the GeoParquet `geo` file metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoColumn {
    pub encoding: String,
    #[serde(default)]
    pub geometry_types: Vec<String>,
}

/// GeoParquet `geo` file metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoMetadata {
    #[serde(default)]
    pub version: Option<String>,
    pub primary_column: String,
    pub columns: HashMap<String, GeoColumn>,
}

/// Frame with a point geometry column and a coordinate reference system.
#[derive(Debug, Clone)]
pub struct GeoDataFrame {
    frame: DataFrame,
    geometry_column: String,
    crs: String,
}

impl GeoDataFrame {
    /// Decode a GeoParquet body. The CRS is assigned after reading and isn't
    /// taken from the file.
    pub fn from_geoparquet(bytes: Bytes, crs: impl Into<String>) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())?;
        let geo = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == GEO_METADATA_KEY))
            .and_then(|kv| kv.value.as_deref())
            .ok_or_else(|| ClientError::GeoParquet("missing 'geo' file metadata".to_string()))?;
        let geo: GeoMetadata = serde_json::from_str(geo)?;

        let frame = DataFrame::from_parquet(bytes)?;
        let geometry_column = geo.primary_column.clone();
        let column = geo.columns.get(&geometry_column).ok_or_else(|| {
            ClientError::GeoParquet(format!("no metadata for column '{geometry_column}'"))
        })?;
        if !column.encoding.eq_ignore_ascii_case("WKB") {
            return Err(ClientError::GeoParquet(format!(
                "unsupported geometry encoding '{}'",
                column.encoding
            )));
        }
        frame.schema().index_of(&geometry_column)?;

        Ok(GeoDataFrame {
            frame,
            geometry_column,
            crs: crs.into(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn set_crs(&mut self, crs: impl Into<String>) {
        self.crs = crs.into();
    }

    pub fn num_rows(&self) -> usize {
        self.frame.num_rows()
    }

    /// Geometries decoded as `(x, y)` points. Null geometries are `None`.
    pub fn points(&self) -> Result<Vec<Option<(f64, f64)>>> {
        let column = self.frame.column(&self.geometry_column)?;
        let values: Vec<Option<&[u8]>> = match column.data_type() {
            DataType::Binary => column.as_binary::<i32>().iter().collect(),
            DataType::LargeBinary => column.as_binary::<i64>().iter().collect(),
            DataType::BinaryView => column.as_binary_view().iter().collect(),
            other => {
                return Err(ClientError::GeoParquet(format!(
                    "geometry column has type {other}, expected binary"
                )));
            }
        };
        values
            .into_iter()
            .map(|v| v.map(wkb_point).transpose())
            .collect()
    }
}

/// Decode a WKB point, ignoring any Z/M ordinates.
fn wkb_point(mut buf: &[u8]) -> Result<(f64, f64)> {
    let invalid = || ClientError::GeoParquet("truncated WKB geometry".to_string());
    if buf.remaining() < 5 {
        return Err(invalid());
    }
    let little_endian = buf.get_u8() == 1;
    let geom_type = if little_endian {
        buf.get_u32_le()
    } else {
        buf.get_u32()
    };
    // ISO (1001, 2001, 3001) and EWKB (high flag bits) dimension variants.
    let base_type = (geom_type & 0x0FFF_FFFF) % 1000;
    if base_type != WKB_POINT {
        return Err(ClientError::GeoParquet(format!(
            "unsupported WKB geometry type {geom_type}"
        )));
    }
    if geom_type & 0x2000_0000 != 0 {
        // EWKB SRID
        if buf.remaining() < 4 {
            return Err(invalid());
        }
        buf.advance(4);
    }
    if buf.remaining() < 16 {
        return Err(invalid());
    }
    Ok(if little_endian {
        (buf.get_f64_le(), buf.get_f64_le())
    } else {
        (buf.get_f64(), buf.get_f64())
    })
}
