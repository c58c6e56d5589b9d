#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Incomplete query: {0}")]
    IncompleteQuery(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Failed to serialize value for the wire: {0}")]
    Serialization(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
