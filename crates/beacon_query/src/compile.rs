use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::errors::{QueryError, Result};
use crate::filter::FilterExpr;
use crate::output::OutputSpec;
use crate::query::{DEFAULT_SOURCE, DataSource, Query};
use crate::select::SelectExpr;

/// A request the engine's query endpoints accept.
///
/// Materializers clone a request and replace its output before compiling.
pub trait QueryRequest: Clone {
    /// Source the request reads from, when it names one.
    fn data_source(&self) -> Option<&DataSource>;

    fn replace_output(&mut self, output: OutputSpec);

    /// The JSON document posted to the engine.
    fn request_body(&self) -> Result<Value>;
}

/// The canonical request document sent to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRequest {
    pub from: String,
    pub select: Vec<Value>,
    pub filters: Vec<Value>,
    pub output: Value,
}

impl CompiledRequest {
    pub fn to_json_value(&self) -> Value {
        serde_json::json!({
            "from": self.from,
            "select": self.select,
            "filters": self.filters,
            "output": self.output,
        })
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| QueryError::Serialization(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| QueryError::Serialization(e.to_string()))
    }
}

impl Query {
    /// Compile the builder state into a request.
    ///
    /// Fails if no output has been set or if the selection was never
    /// configured. An explicitly empty selection is fine.
    pub fn compile(&self) -> Result<CompiledRequest> {
        let output = self.output.as_ref().ok_or_else(|| {
            QueryError::IncompleteQuery("Output must be set before compiling the query".to_string())
        })?;
        if !self.selects_configured {
            return Err(QueryError::IncompleteQuery(
                "Selects must be set before compiling the query".to_string(),
            ));
        }

        let from = self
            .source
            .as_ref()
            .map(|s| s.identifier())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE)
            .to_string();

        let select = self
            .selects
            .iter()
            .map(SelectExpr::to_json)
            .collect::<Result<Vec<_>>>()?;
        let filters = self
            .filters
            .iter()
            .map(FilterExpr::to_json)
            .collect::<Result<Vec<_>>>()?;
        let output = output.to_json()?;

        trace!(%from, selects = select.len(), filters = filters.len(), "compiled query");

        Ok(CompiledRequest {
            from,
            select,
            filters,
            output,
        })
    }
}

impl QueryRequest for Query {
    fn data_source(&self) -> Option<&DataSource> {
        self.source()
    }

    fn replace_output(&mut self, output: OutputSpec) {
        self.set_output(output);
    }

    fn request_body(&self) -> Result<Value> {
        Ok(self.compile()?.to_json_value())
    }
}
