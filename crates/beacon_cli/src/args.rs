use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[clap(name = "beacon", version, about = "Query a Beacon node")]
pub struct Arguments {
    /// Base URL of the Beacon node. Any path prefix is kept.
    #[clap(long, env = "BEACON_URL", default_value = "http://localhost:5001")]
    pub url: String,

    /// Header sent with every request, as `NAME:VALUE`. May be repeated.
    #[clap(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request timeout in seconds.
    #[clap(long, default_value_t = 300)]
    pub timeout: u64,

    /// Log level for messages written to stderr.
    #[clap(long, env = "BEACON_LOG", default_value = "warn")]
    pub log_level: tracing::Level,

    #[clap(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Print the compiled request instead of sending it.
    #[clap(long, conflicts_with = "explain")]
    pub dry_run: bool,

    /// Print the query plan instead of running the query.
    #[clap(long)]
    pub explain: bool,

    #[clap(flatten)]
    pub query: QueryArgs,

    /// Result format.
    #[clap(long, value_enum, default_value_t = Format::Parquet)]
    pub format: Format,

    /// Have the node build NetCDF output instead of building it locally.
    #[clap(long)]
    pub remote_netcdf: bool,

    /// Where to write the result. Required unless --dry-run or --explain.
    #[clap(short, long, required_unless_present_any = ["dry_run", "explain"])]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct QueryArgs {
    /// Table to query. Defaults to the node's default table.
    #[clap(long, conflicts_with = "dataset")]
    pub table: Option<String>,

    /// Dataset (file path on the node) to query directly.
    #[clap(long)]
    pub dataset: Option<String>,

    /// Raw SQL statement to run instead of a built query.
    #[clap(
        long,
        conflicts_with_all = ["table", "dataset", "selects", "is_not_null", "ranges", "bbox"]
    )]
    pub sql: Option<String>,

    /// Column to select, optionally aliased as `COLUMN=ALIAS`. May be repeated.
    #[clap(short, long = "select", required_unless_present = "sql", value_parser = parse_select)]
    pub selects: Vec<(String, Option<String>)>,

    /// Keep rows where the column is not null. May be repeated.
    #[clap(long)]
    pub is_not_null: Vec<String>,

    /// Inclusive numeric range as `COLUMN=MIN,MAX`. Either bound may be empty.
    #[clap(long = "range", value_parser = parse_range)]
    pub ranges: Vec<(String, Option<f64>, Option<f64>)>,

    /// Bounding box as `MIN_LON,MIN_LAT,MAX_LON,MAX_LAT`.
    #[clap(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<(f64, f64, f64, f64)>,

    #[clap(long, default_value = "LONGITUDE")]
    pub lon_column: String,

    #[clap(long, default_value = "LATITUDE")]
    pub lat_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Parquet,
    Arrow,
    Csv,
    Geoparquet,
    Netcdf,
    Zarr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for logutil::LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => logutil::LogFormat::HumanReadable,
            LogFormatArg::Json => logutil::LogFormat::Json,
        }
    }
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{s}'"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_select(s: &str) -> Result<(String, Option<String>), String> {
    match s.split_once('=') {
        Some((column, alias)) if !column.is_empty() && !alias.is_empty() => {
            Ok((column.to_string(), Some(alias.to_string())))
        }
        Some(_) => Err(format!("expected COLUMN=ALIAS, got '{s}'")),
        None if s.is_empty() => Err("empty column name".to_string()),
        None => Ok((s.to_string(), None)),
    }
}

fn parse_bound(s: &str) -> Result<Option<f64>, String> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    s.trim()
        .parse()
        .map(Some)
        .map_err(|e| format!("invalid bound '{s}': {e}"))
}

fn parse_range(s: &str) -> Result<(String, Option<f64>, Option<f64>), String> {
    let (column, bounds) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=MIN,MAX, got '{s}'"))?;
    let (min, max) = bounds
        .split_once(',')
        .ok_or_else(|| format!("expected COLUMN=MIN,MAX, got '{s}'"))?;
    Ok((column.to_string(), parse_bound(min)?, parse_bound(max)?))
}

fn parse_bbox(s: &str) -> Result<(f64, f64, f64, f64), String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("invalid bbox '{s}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [min_lon, min_lat, max_lon, max_lat] => Ok((*min_lon, *min_lat, *max_lon, *max_lat)),
        _ => Err(format!("expected 4 comma separated numbers, got '{s}'")),
    }
}
