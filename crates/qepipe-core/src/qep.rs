//! Raw query-plan nodes as produced by `EXPLAIN (VERBOSE, FORMAT JSON)`.
//!
//! Field names follow the engine's JSON keys. Everything except `Node Type`
//! is optional because field presence varies per node kind; keys we do not
//! model are kept in `extra` so a normalized tree serializes back losslessly.
//! The normalizer rewrites these nodes and then converts them into the typed
//! [`crate::plan::PlanNode`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QepNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,

    #[serde(rename = "Parent Relationship", default, skip_serializing_if = "Option::is_none")]
    pub parent_relationship: Option<String>,
    #[serde(rename = "Subplan Name", default, skip_serializing_if = "Option::is_none")]
    pub subplan_name: Option<String>,

    #[serde(rename = "Relation Name", default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(rename = "Schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "Alias", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "CTE Name", default, skip_serializing_if = "Option::is_none")]
    pub cte_name: Option<String>,
    #[serde(rename = "Index Name", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "Scan Direction", default, skip_serializing_if = "Option::is_none")]
    pub scan_direction: Option<String>,

    #[serde(rename = "Startup Cost", default, skip_serializing_if = "Option::is_none")]
    pub startup_cost: Option<f64>,
    #[serde(rename = "Total Cost", default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(rename = "Plan Rows", default, skip_serializing_if = "Option::is_none")]
    pub plan_rows: Option<f64>,

    #[serde(rename = "Output", default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,

    // Predicate-bearing fields, folded into `filters` by the normalizer.
    #[serde(rename = "Filter", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(rename = "Index Cond", default, skip_serializing_if = "Option::is_none")]
    pub index_cond: Option<String>,
    #[serde(rename = "Recheck Cond", default, skip_serializing_if = "Option::is_none")]
    pub recheck_cond: Option<String>,
    #[serde(rename = "Join Filter", default, skip_serializing_if = "Option::is_none")]
    pub join_filter: Option<String>,
    #[serde(rename = "One-Time Filter", default, skip_serializing_if = "Option::is_none")]
    pub one_time_filter: Option<String>,

    // Join-condition fields, folded into `join_on` by the normalizer.
    #[serde(rename = "Hash Cond", default, skip_serializing_if = "Option::is_none")]
    pub hash_cond: Option<String>,
    #[serde(rename = "Merge Cond", default, skip_serializing_if = "Option::is_none")]
    pub merge_cond: Option<String>,

    #[serde(rename = "Join Type", default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    #[serde(rename = "Sort Key", default, skip_serializing_if = "Vec::is_empty")]
    pub sort_key: Vec<String>,
    #[serde(rename = "Group Key", default, skip_serializing_if = "Vec::is_empty")]
    pub group_key: Vec<String>,
    #[serde(rename = "Strategy", default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(rename = "Command", default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(rename = "All", default, skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,

    // Canonical fields attached during normalization.
    #[serde(rename = "Index Key", default, skip_serializing_if = "Option::is_none")]
    pub index_key: Option<Vec<String>>,
    #[serde(rename = "Join On", default, skip_serializing_if = "Option::is_none")]
    pub join_on: Option<String>,
    #[serde(rename = "Filters", default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<QepNode>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QepNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    /// True when this node is rendered separately as an InitPlan/SubPlan.
    pub fn is_subplan(&self) -> bool {
        matches!(
            self.parent_relationship.as_deref(),
            Some("InitPlan") | Some("SubPlan")
        )
    }

    /// Number of nodes in this subtree (including `self`).
    pub fn node_count(&self) -> usize {
        1 + self.plans.iter().map(QepNode::node_count).sum::<usize>()
    }

    /// Parse the root plan node out of `EXPLAIN (FORMAT JSON)` output.
    ///
    /// Accepts the full `[{"Plan": {...}}]` document, a single `{"Plan": {...}}`
    /// object, or a bare plan node.
    pub fn from_explain_json(src: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(src)?;
        Self::from_explain_value(value)
    }

    pub fn from_explain_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(mut items) => {
                if items.is_empty() {
                    return Err(Error::malformed("EXPLAIN", "Plan"));
                }
                Self::from_explain_value(items.swap_remove(0))
            }
            Value::Object(mut obj) if !obj.contains_key("Node Type") => {
                let plan = obj
                    .remove("Plan")
                    .ok_or_else(|| Error::malformed("EXPLAIN", "Plan"))?;
                Ok(serde_json::from_value(plan)?)
            }
            other => Ok(serde_json::from_value(other)?),
        }
    }
}
