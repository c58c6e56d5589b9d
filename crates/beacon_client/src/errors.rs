use beacon_query::QueryError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Query failed ({status}): {message}")]
    QueryExecution { status: StatusCode, message: String },

    #[error("Query returned no content")]
    EmptyResult,

    #[error("Invalid query plan: {0}")]
    InvalidPlan(String),

    #[error("{feature} requires Beacon server version {required} or higher, server is {actual}")]
    UnsupportedServerVersion {
        feature: &'static str,
        required: String,
        actual: String,
    },

    #[error("Invalid server version '{0}'")]
    InvalidServerVersion(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header {0}")]
    InvalidHeader(String),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Zarr error: {0}")]
    Zarr(String),

    #[error("NetCDF error: {0}")]
    Netcdf(String),

    #[error("GeoParquet error: {0}")]
    GeoParquet(String),

    #[error("Cannot materialize column '{column}': {reason}")]
    Materialize { column: String, reason: String },
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
