use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::errors::{ClientError, Result};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const INFO_ENDPOINT: &str = "/api/info";

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized JSON document.
    Json(Vec<u8>),
    Binary(Vec<u8>),
}

/// Status and full body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    /// Body decoded as (lossy) utf8. Used for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Semantic version reported by a Beacon node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ServerVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        ServerVersion {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ServerVersion {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Drop pre-release and build suffixes, e.g. "1.4.0-beta+abc".
        let core = s
            .trim()
            .trim_start_matches('v')
            .split(['-', '+'])
            .next()
            .unwrap_or_default();

        let mut parts = core.split('.').map(|p| p.parse::<u64>());
        let mut next = || -> Result<u64> {
            match parts.next() {
                Some(Ok(v)) => Ok(v),
                Some(Err(_)) => Err(ClientError::InvalidServerVersion(s.to_string())),
                None => Ok(0),
            }
        };
        Ok(ServerVersion::new(next()?, next()?, next()?))
    }
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    beacon_version: String,
}

fn fetch_server_version<S: HttpSession + ?Sized>(session: &S) -> Result<ServerVersion> {
    let resp = session.get(INFO_ENDPOINT)?;
    if !resp.status.is_success() {
        return Err(ClientError::QueryExecution {
            status: resp.status,
            message: resp.text(),
        });
    }
    let info: ServerInfo = resp.json()?;
    info.beacon_version.parse()
}

/// The HTTP capability queries are executed through.
///
/// Implementations own connection setup, auth headers, timeouts and retries.
/// Transport failures are returned as errors; callers don't retry.
pub trait HttpSession: Debug {
    fn get(&self, path: &str) -> Result<HttpResponse>;

    fn post(&self, path: &str, body: RequestBody) -> Result<HttpResponse>;

    /// Version of the node behind this session.
    fn server_version(&self) -> Result<ServerVersion> {
        fetch_server_version(self)
    }

    fn version_at_least(&self, major: u64, minor: u64, patch: u64) -> Result<bool> {
        Ok(self.server_version()? >= ServerVersion::new(major, minor, patch))
    }
}

impl<S: HttpSession + ?Sized> HttpSession for &S {
    fn get(&self, path: &str) -> Result<HttpResponse> {
        (**self).get(path)
    }

    fn post(&self, path: &str, body: RequestBody) -> Result<HttpResponse> {
        (**self).post(path, body)
    }

    fn server_version(&self) -> Result<ServerVersion> {
        (**self).server_version()
    }
}

#[derive(Debug, Default)]
pub struct ReqwestSessionBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: HeaderMap,
    user_agent: Option<String>,
}

impl ReqwestSessionBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// Add a header sent with every request, e.g. a proxy or auth header the
    /// caller constructed.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::InvalidHeader(format!("'{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidHeader(format!("value for '{name}': {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self, base_url: &str) -> Result<ReqwestSession> {
        let mut base_url = Url::parse(base_url)?;
        // Keep any path prefix when joining endpoints onto the base.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut default_headers = self.headers;
        default_headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(APP_USER_AGENT))
            .default_headers(default_headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        Ok(ReqwestSession {
            base_url,
            inner: builder.build()?,
            version: OnceLock::new(),
        })
    }
}

/// Blocking session backed by `reqwest`.
#[derive(Debug)]
pub struct ReqwestSession {
    base_url: Url,
    inner: Client,
    /// Server version, fetched on first use.
    version: OnceLock<ServerVersion>,
}

impl ReqwestSession {
    pub fn builder() -> ReqwestSessionBuilder {
        ReqwestSessionBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn read_response(resp: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = resp.status();
        let body = resp.bytes()?;
        trace!(%status, len = body.len(), "response");
        Ok(HttpResponse { status, body })
    }
}

impl HttpSession for ReqwestSession {
    fn get(&self, path: &str) -> Result<HttpResponse> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        Self::read_response(self.inner.get(url).send()?)
    }

    fn post(&self, path: &str, body: RequestBody) -> Result<HttpResponse> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let (content_type, body) = match body {
            RequestBody::Json(b) => ("application/json", b),
            RequestBody::Binary(b) => ("application/octet-stream", b),
        };
        let resp = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .body(body)
            .send()?;
        Self::read_response(resp)
    }

    fn server_version(&self) -> Result<ServerVersion> {
        if let Some(v) = self.version.get() {
            return Ok(*v);
        }
        let version = fetch_server_version(self)?;
        let _ = self.version.set(version);
        Ok(version)
    }
}
