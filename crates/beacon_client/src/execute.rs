use beacon_query::{DataSource, QueryRequest};
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, trace};

use crate::errors::{ClientError, Result};
use crate::plan::PlanTree;
use crate::session::{HttpResponse, HttpSession, RequestBody, ServerVersion};

pub const QUERY_ENDPOINT: &str = "/api/query";
pub const EXPLAIN_ENDPOINT: &str = "/api/explain-query";

/// Oldest node version able to query individual datasets.
pub const DATASET_QUERY_MIN_VERSION: ServerVersion = ServerVersion::new(1, 4, 0);

/// Successful response of a query, body in the requested output format.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub status: StatusCode,
    pub bytes: Bytes,
}

/// Compile and run a query or SQL statement, returning the raw body.
///
/// Errors with `QueryExecution` on a non-success status, and `EmptyResult`
/// when a success response has no body. Every output format carries framing
/// bytes, so an empty body is never a valid empty table.
pub fn execute<S, R>(session: &S, query: &R) -> Result<RawResult>
where
    S: HttpSession + ?Sized,
    R: QueryRequest,
{
    let resp = send(session, QUERY_ENDPOINT, query)?;
    if resp.body.is_empty() {
        return Err(ClientError::EmptyResult);
    }
    trace!(len = resp.body.len(), "query returned");

    Ok(RawResult {
        status: resp.status,
        bytes: resp.body,
    })
}

/// Ask the engine for the plan of a query without running it.
pub fn explain<S, R>(session: &S, query: &R) -> Result<PlanTree>
where
    S: HttpSession + ?Sized,
    R: QueryRequest,
{
    let resp = send(session, EXPLAIN_ENDPOINT, query)?;
    PlanTree::from_slice(&resp.body)
}

fn send<S, R>(session: &S, endpoint: &str, query: &R) -> Result<HttpResponse>
where
    S: HttpSession + ?Sized,
    R: QueryRequest,
{
    check_source_supported(session, query)?;

    let body = serde_json::to_vec(&query.request_body()?)?;
    debug!(endpoint, request = %String::from_utf8_lossy(&body), "sending query");

    let resp = session.post(endpoint, RequestBody::Json(body))?;
    if !resp.status.is_success() {
        return Err(ClientError::QueryExecution {
            status: resp.status,
            message: resp.text(),
        });
    }
    Ok(resp)
}

fn check_source_supported<S, R>(session: &S, query: &R) -> Result<()>
where
    S: HttpSession + ?Sized,
    R: QueryRequest,
{
    if let Some(DataSource::Dataset(_)) = query.data_source() {
        let version = session.server_version()?;
        if version < DATASET_QUERY_MIN_VERSION {
            return Err(ClientError::UnsupportedServerVersion {
                feature: "Querying datasets",
                required: DATASET_QUERY_MIN_VERSION.to_string(),
                actual: version.to_string(),
            });
        }
    }
    Ok(())
}
