//! Typed builder for Beacon JSON queries.
//!
//! A [`Query`] collects selections, filters and an output format, then
//! compiles into a [`CompiledRequest`], the canonical document the engine
//! expects on its query endpoints. A [`SqlQuery`] carries raw SQL to the
//! same endpoints.

pub mod compile;
pub mod dtype;
pub mod errors;
pub mod filter;
pub mod functions;
pub mod output;
pub mod query;
pub mod scalar;
pub mod select;
pub mod sql;

pub use compile::{CompiledRequest, QueryRequest};
pub use dtype::{DType, DTypeFamily, TimeUnit};
pub use errors::{QueryError, Result};
pub use filter::FilterExpr;
pub use output::{OdvColumn, OdvOutput, OutputSpec};
pub use query::{DEFAULT_SOURCE, DataSource, Query, SubsetOptions};
pub use scalar::Scalar;
pub use select::SelectExpr;
pub use sql::SqlQuery;
