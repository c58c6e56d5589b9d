use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ClientError, Result};

/// One node of a query plan as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,

    /// Child plans, in the order the engine reported them.
    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,

    /// Everything else on the node ("Condition", "Expressions", "Output",
    /// ...), untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Query plan returned by the explain endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTree {
    /// The document as returned by the engine.
    pub raw: Value,
    pub root: PlanNode,
}

impl PlanTree {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Value = serde_json::from_slice(bytes)?;
        Self::from_value(raw)
    }

    /// Parse an explain document.
    ///
    /// The engine returns `[{"Plan": {...}}]`. A bare `{"Plan": ...}` object or
    /// a bare root node are accepted too.
    pub fn from_value(raw: Value) -> Result<Self> {
        let root = {
            let mut doc = &raw;
            if let Value::Array(items) = doc {
                doc = items.first().ok_or_else(|| {
                    ClientError::InvalidPlan("explain returned an empty plan list".to_string())
                })?;
            }
            let node = doc.get("Plan").unwrap_or(doc);
            PlanNode::deserialize(node)?
        };
        Ok(PlanTree { raw, root })
    }

    /// Depth-first, pre-order walk over all nodes with their depth.
    pub fn walk(&self) -> Vec<(usize, &PlanNode)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, &self.root)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}
