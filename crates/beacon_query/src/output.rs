use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::{QueryError, Result};

/// Default archiving method for ODV exports.
pub const DEFAULT_ODV_ARCHIVING: &str = "zip_deflate";

/// A column in an ODV (Ocean Data View) export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdvColumn {
    #[serde(rename = "column_name")]
    pub name: String,
    /// Column holding the quality flags for this column.
    pub qf_column: Option<String>,
    pub comment: Option<String>,
    pub unit: Option<String>,
}

impl OdvColumn {
    pub fn new(name: impl Into<String>) -> Self {
        OdvColumn {
            name: name.into(),
            qf_column: None,
            comment: None,
            unit: None,
        }
    }

    pub fn with_qf_column(mut self, qf_column: impl Into<String>) -> Self {
        self.qf_column = Some(qf_column.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Parameters for an ODV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdvOutput {
    #[serde(rename = "longitude_column")]
    pub lon: OdvColumn,
    #[serde(rename = "latitude_column")]
    pub lat: OdvColumn,
    #[serde(rename = "time_column")]
    pub time: OdvColumn,
    #[serde(rename = "depth_column")]
    pub depth: OdvColumn,
    pub data_columns: Vec<OdvColumn>,
    pub metadata_columns: Vec<OdvColumn>,
    /// Quality flag scheme name, e.g. "SEADATANET".
    pub qf_schema: String,
    /// Column identifying individual stations/profiles.
    pub key_column: String,
    pub archiving: String,
}

impl OdvOutput {
    pub fn new(
        lon: OdvColumn,
        lat: OdvColumn,
        time: OdvColumn,
        depth: OdvColumn,
        qf_schema: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Self {
        OdvOutput {
            lon,
            lat,
            time,
            depth,
            data_columns: Vec::new(),
            metadata_columns: Vec::new(),
            qf_schema: qf_schema.into(),
            key_column: key_column.into(),
            archiving: DEFAULT_ODV_ARCHIVING.to_string(),
        }
    }

    pub fn with_data_columns(mut self, cols: impl IntoIterator<Item = OdvColumn>) -> Self {
        self.data_columns.extend(cols);
        self
    }

    pub fn with_metadata_columns(mut self, cols: impl IntoIterator<Item = OdvColumn>) -> Self {
        self.metadata_columns.extend(cols);
        self
    }

    pub fn with_archiving(mut self, archiving: impl Into<String>) -> Self {
        self.archiving = archiving.into();
        self
    }
}

/// Format the engine should produce.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    NetCdf,
    Arrow,
    Parquet,
    GeoParquet {
        lon_column: String,
        lat_column: String,
    },
    Csv,
    Odv(Box<OdvOutput>),
}

impl OutputSpec {
    pub fn geoparquet(lon_column: impl Into<String>, lat_column: impl Into<String>) -> Self {
        Self::GeoParquet {
            lon_column: lon_column.into(),
            lat_column: lat_column.into(),
        }
    }

    pub fn odv(output: OdvOutput) -> Self {
        Self::Odv(Box::new(output))
    }

    /// Short name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NetCdf => "netcdf",
            Self::Arrow => "arrow",
            Self::Parquet => "parquet",
            Self::GeoParquet { .. } => "geoparquet",
            Self::Csv => "csv",
            Self::Odv(_) => "odv",
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::NetCdf | Self::Arrow | Self::Parquet | Self::Csv => json!({"format": self.name()}),
            Self::GeoParquet {
                lon_column,
                lat_column,
            } => json!({
                "format": {
                    "geoparquet": {
                        "longitude_column": lon_column,
                        "latitude_column": lat_column,
                    }
                }
            }),
            Self::Odv(odv) => {
                let params = serde_json::to_value(odv.as_ref())
                    .map_err(|e| QueryError::Serialization(e.to_string()))?;
                json!({"format": {"odv": params}})
            }
        })
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
