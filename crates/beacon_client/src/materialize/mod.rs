//! Turning query results into files and in-memory tables.

pub mod dataset;
pub mod file;
pub mod frame;
pub mod geo;
pub mod netcdf;
pub mod zarr;

pub use dataset::{Attribute, Dataset, Dimension, INDEX_DIM, Values, Variable};
pub use frame::DataFrame;
pub use geo::{DEFAULT_CRS, GeoDataFrame};

/// Where a NetCDF file gets built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetcdfBuild {
    /// Fetch parquet and encode the NetCDF file in this process.
    #[default]
    Local,
    /// Have the engine produce the NetCDF file.
    Remote,
}
