#![allow(dead_code)]

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use arrow::array::{BinaryArray, Float64Array, Int32Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use beacon_client::session::{HttpResponse, HttpSession, RequestBody};
use beacon_client::Result;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use reqwest::StatusCode;
use serde_json::{Value, json};

type Handler = Box<dyn Fn(&str, &Value) -> HttpResponse>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Session answering from a closure and recording every request.
pub struct MockSession {
    version: String,
    handler: Handler,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("version", &self.version)
            .field("requests", &self.requests)
            .finish_non_exhaustive()
    }
}

impl MockSession {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> HttpResponse + 'static,
    {
        logutil::init_test();
        MockSession {
            version: "1.5.0".to_string(),
            handler: Box::new(handler),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Always answer with the same status and body.
    pub fn fixed(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(move |_, _| HttpResponse::new(status, body.clone()))
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }
}

impl HttpSession for MockSession {
    fn get(&self, path: &str) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            body: None,
        });
        if path == "/api/info" {
            let body = json!({"beacon_version": self.version}).to_string();
            return Ok(HttpResponse::new(StatusCode::OK, body));
        }
        Ok(HttpResponse::new(StatusCode::NOT_FOUND, "not found"))
    }

    fn post(&self, path: &str, body: RequestBody) -> Result<HttpResponse> {
        let body = match body {
            RequestBody::Json(b) => serde_json::from_slice(&b)?,
            RequestBody::Binary(_) => Value::Null,
        };
        let resp = (self.handler)(path, &body);
        self.requests.borrow_mut().push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body: Some(body),
        });
        Ok(resp)
    }
}

/// Output format name of a compiled request body.
pub fn output_format(body: &Value) -> String {
    match &body["output"]["format"] {
        Value::String(s) => s.clone(),
        Value::Object(m) => m.keys().next().cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Fixed three row table of profile observations.
pub fn observations() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("LONGITUDE", DataType::Float64, false),
        Field::new("LATITUDE", DataType::Float64, false),
        Field::new("DEPTH", DataType::Int32, false),
        Field::new("PLATFORM", DataType::Utf8, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![-10.5, 0.25, 12.0])),
            Arc::new(Float64Array::from(vec![42.0, 51.5, 60.125])),
            Arc::new(Int32Array::from(vec![5, 10, 1500])),
            Arc::new(StringArray::from(vec!["ARGO", "GLIDER", "CTD"])),
        ],
    )
    .unwrap()
}

pub fn parquet_bytes(batch: &RecordBatch) -> Bytes {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buf)
}

/// Little endian WKB point.
fn wkb_point(x: f64, y: f64) -> Vec<u8> {
    let mut out = vec![1];
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out
}

/// The observations as GeoParquet, one point per row in a `geometry` column.
pub fn geoparquet_bytes() -> Bytes {
    let schema = Arc::new(Schema::new(vec![
        Field::new("DEPTH", DataType::Int32, false),
        Field::new("geometry", DataType::Binary, false),
    ]));
    let points = [(-10.5, 42.0), (0.25, 51.5), (12.0, 60.125)].map(|(x, y)| wkb_point(x, y));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![5, 10, 1500])),
            Arc::new(BinaryArray::from_iter_values(points.iter())),
        ],
    )
    .unwrap();

    let geo = json!({
        "version": "1.0.0",
        "primary_column": "geometry",
        "columns": {"geometry": {"encoding": "WKB", "geometry_types": ["Point"]}},
    });
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![KeyValue::new("geo".to_string(), geo.to_string())]))
        .build();
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buf)
}
