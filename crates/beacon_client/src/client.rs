use std::path::Path;

use beacon_query::{OdvOutput, OutputSpec, Query, QueryRequest, SqlQuery};
use tracing::debug;

use crate::errors::Result;
use crate::execute::{self, RawResult};
use crate::materialize::file::{write_atomic, write_dir_atomic};
use crate::materialize::{netcdf, zarr};
use crate::materialize::{DEFAULT_CRS, DataFrame, Dataset, GeoDataFrame, NetcdfBuild};
use crate::plan::PlanTree;
use crate::session::HttpSession;

/// Runs queries through a session and materializes their results.
///
/// Every method takes a built [`Query`] or a [`SqlQuery`]. Materializers work
/// on a copy of the request with the output format forced; the caller's
/// request is never changed.
#[derive(Debug)]
pub struct Client<S> {
    session: S,
}

impl<S: HttpSession> Client<S> {
    pub fn new(session: S) -> Self {
        Client { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn query_table(&self, table: impl Into<String>) -> Query {
        Query::from_table(table)
    }

    pub fn query_dataset(&self, path: impl Into<String>) -> Query {
        Query::from_dataset(path)
    }

    /// Raw SQL, run through the same pipeline as a built query.
    pub fn sql_query(&self, sql: impl Into<String>) -> SqlQuery {
        SqlQuery::new(sql)
    }

    pub fn execute(&self, query: &impl QueryRequest) -> Result<RawResult> {
        execute::execute(&self.session, query)
    }

    pub fn explain(&self, query: &impl QueryRequest) -> Result<PlanTree> {
        execute::explain(&self.session, query)
    }

    fn execute_as(&self, query: &impl QueryRequest, output: OutputSpec) -> Result<RawResult> {
        debug!(format = output.name(), "materializing query");
        let mut query = query.clone();
        query.replace_output(output);
        execute::execute(&self.session, &query)
    }

    fn write_remote(
        &self,
        query: &impl QueryRequest,
        output: OutputSpec,
        path: &Path,
    ) -> Result<()> {
        let result = self.execute_as(query, output)?;
        write_atomic(path, &result.bytes)
    }

    pub fn to_arrow(&self, query: &impl QueryRequest, path: impl AsRef<Path>) -> Result<()> {
        self.write_remote(query, OutputSpec::Arrow, path.as_ref())
    }

    pub fn to_parquet(&self, query: &impl QueryRequest, path: impl AsRef<Path>) -> Result<()> {
        self.write_remote(query, OutputSpec::Parquet, path.as_ref())
    }

    pub fn to_geoparquet(
        &self,
        query: &impl QueryRequest,
        path: impl AsRef<Path>,
        lon_column: &str,
        lat_column: &str,
    ) -> Result<()> {
        self.write_remote(
            query,
            OutputSpec::geoparquet(lon_column, lat_column),
            path.as_ref(),
        )
    }

    pub fn to_csv(&self, query: &impl QueryRequest, path: impl AsRef<Path>) -> Result<()> {
        self.write_remote(query, OutputSpec::Csv, path.as_ref())
    }

    pub fn to_odv(
        &self,
        query: &impl QueryRequest,
        odv: OdvOutput,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.write_remote(query, OutputSpec::odv(odv), path.as_ref())
    }

    pub fn to_netcdf(
        &self,
        query: &impl QueryRequest,
        path: impl AsRef<Path>,
        build: NetcdfBuild,
    ) -> Result<()> {
        match build {
            NetcdfBuild::Remote => self.write_remote(query, OutputSpec::NetCdf, path.as_ref()),
            NetcdfBuild::Local => {
                let dataset = self.to_dataset(query)?;
                write_atomic(path.as_ref(), &netcdf::encode(&dataset)?)
            }
        }
    }

    pub fn to_zarr(&self, query: &impl QueryRequest, path: impl AsRef<Path>) -> Result<()> {
        let dataset = self.to_dataset(query)?;
        write_dir_atomic(path.as_ref(), |staged| zarr::write_dataset(&dataset, staged))
    }

    pub fn to_dataframe(&self, query: &impl QueryRequest) -> Result<DataFrame> {
        let result = self.execute_as(query, OutputSpec::Parquet)?;
        DataFrame::from_parquet(result.bytes)
    }

    /// Fetch GeoParquet and decode it. `crs` defaults to EPSG:4326.
    pub fn to_geo_dataframe(
        &self,
        query: &impl QueryRequest,
        lon_column: &str,
        lat_column: &str,
        crs: Option<&str>,
    ) -> Result<GeoDataFrame> {
        let result = self.execute_as(query, OutputSpec::geoparquet(lon_column, lat_column))?;
        GeoDataFrame::from_geoparquet(result.bytes, crs.unwrap_or(DEFAULT_CRS))
    }

    /// Fetch parquet and convert it to an `index` dimensioned dataset.
    pub fn to_dataset(&self, query: &impl QueryRequest) -> Result<Dataset> {
        Dataset::from_frame(&self.to_dataframe(query)?)
    }
}
