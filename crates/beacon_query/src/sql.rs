use serde_json::{Value, json};
use tracing::trace;

use crate::compile::QueryRequest;
use crate::errors::{QueryError, Result};
use crate::output::OutputSpec;
use crate::query::DataSource;

/// A raw SQL statement, sent to the engine as is.
///
/// Compiles to `{"sql": ..., "output": ...}` and runs through the same
/// endpoints as a [`Query`](crate::Query).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    sql: String,
    output: Option<OutputSpec>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        SqlQuery {
            sql: sql.into(),
            output: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn output(&self) -> Option<&OutputSpec> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: OutputSpec) -> &mut Self {
        self.output = Some(output);
        self
    }

    /// Build the request document. Fails on blank SQL or a missing output.
    pub fn compile(&self) -> Result<Value> {
        if self.sql.trim().is_empty() {
            return Err(QueryError::IncompleteQuery(
                "SQL statement must not be empty".to_string(),
            ));
        }
        let output = self.output.as_ref().ok_or_else(|| {
            QueryError::IncompleteQuery("Output must be set before compiling the query".to_string())
        })?;
        let output = output.to_json()?;

        trace!(len = self.sql.len(), "compiled sql query");
        Ok(json!({
            "sql": self.sql,
            "output": output,
        }))
    }
}

impl QueryRequest for SqlQuery {
    fn data_source(&self) -> Option<&DataSource> {
        None
    }

    fn replace_output(&mut self, output: OutputSpec) {
        self.set_output(output);
    }

    fn request_body(&self) -> Result<Value> {
        self.compile()
    }
}
