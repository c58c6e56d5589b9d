//! Execute Beacon queries over HTTP and materialize their results.

pub mod client;
pub mod errors;
pub mod execute;
pub mod materialize;
pub mod plan;
pub mod session;

pub use client::Client;
pub use errors::{ClientError, Result};
pub use execute::{RawResult, execute, explain};
pub use materialize::{DataFrame, Dataset, GeoDataFrame, NetcdfBuild};
pub use plan::{PlanNode, PlanTree};
pub use session::{HttpResponse, HttpSession, RequestBody, ReqwestSession, ServerVersion};
