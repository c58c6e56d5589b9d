use serde_json::{Map, Value};

use crate::errors::{QueryError, Result};
use crate::scalar::Scalar;

/// One output column of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    /// Reference to a column in the source table.
    Column { name: String, alias: Option<String> },
    /// Call to a named server-side function.
    FunctionCall {
        name: String,
        args: Vec<SelectExpr>,
        alias: Option<String>,
    },
    /// A constant value.
    Literal { value: Scalar, alias: Option<String> },
}

impl SelectExpr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            name: name.into(),
            alias: None,
        }
    }

    pub fn function<I, A>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<SelectExpr>,
    {
        Self::FunctionCall {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            alias: None,
        }
    }

    pub fn literal(value: impl Into<Scalar>) -> Self {
        Self::Literal {
            value: value.into(),
            alias: None,
        }
    }

    /// Set (or replace) the output column name.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.set_alias(Some(name.into()));
        self
    }

    pub(crate) fn set_alias(&mut self, new_alias: Option<String>) {
        match self {
            Self::Column { alias, .. }
            | Self::FunctionCall { alias, .. }
            | Self::Literal { alias, .. } => *alias = new_alias,
        }
    }

    pub fn get_alias(&self) -> Option<&str> {
        match self {
            Self::Column { alias, .. }
            | Self::FunctionCall { alias, .. }
            | Self::Literal { alias, .. } => alias.as_deref(),
        }
    }

    /// Serialize this expression, recursing into function arguments.
    pub fn to_json(&self) -> Result<Value> {
        if let Some(alias) = self.get_alias() {
            if alias.is_empty() {
                return Err(QueryError::InvalidExpression(
                    "select alias cannot be an empty string".to_string(),
                ));
            }
        }

        let mut obj = Map::new();
        match self {
            Self::Column { name, .. } => {
                obj.insert("column".to_string(), Value::String(name.clone()));
            }
            Self::FunctionCall { name, args, .. } => {
                let args = args
                    .iter()
                    .map(SelectExpr::to_json)
                    .collect::<Result<Vec<_>>>()?;
                obj.insert("function".to_string(), Value::String(name.clone()));
                obj.insert("args".to_string(), Value::Array(args));
            }
            Self::Literal { value, .. } => {
                obj.insert("value".to_string(), value.to_json()?);
            }
        }
        obj.insert(
            "alias".to_string(),
            self.get_alias()
                .map(|a| Value::String(a.to_string()))
                .unwrap_or(Value::Null),
        );

        Ok(Value::Object(obj))
    }
}

// Bare column names are promoted to unaliased column references. Every entry
// point accepting `impl Into<SelectExpr>` goes through these.

impl From<&str> for SelectExpr {
    fn from(value: &str) -> Self {
        SelectExpr::column(value)
    }
}

impl From<String> for SelectExpr {
    fn from(value: String) -> Self {
        SelectExpr::column(value)
    }
}

impl From<&String> for SelectExpr {
    fn from(value: &String) -> Self {
        SelectExpr::column(value.as_str())
    }
}
