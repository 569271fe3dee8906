use thiserror::Error;

/// Canonical result for qepipe.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A field the node kind requires is absent.
    #[error("malformed plan: '{node_type}' node is missing required field '{field}'")]
    MalformedPlan {
        node_type: String,
        field: &'static str,
    },

    #[error("unsupported join kind: {0}")]
    UnsupportedJoinKind(String),

    #[error("join expects 2 operands, got: {found}")]
    InsufficientJoinOperands { found: usize },

    #[error("set operation expects at least 2 operands, got: {found}")]
    InsufficientSetOperands { found: usize },

    // Raised by the normalizer when two rewrites both try to set the canonical
    // join condition; this is a pipeline bug or a malformed input, never patched.
    #[error("'{node_type}' node already carries a join condition")]
    DuplicateJoinCondition { node_type: String },

    #[error("catalog lookup failed for '{object}' in schema '{schema}': {reason}")]
    CatalogLookup {
        object: String,
        schema: String,
        reason: String,
    },

    #[error("dialect transpile of '{expr}' produced {statements} statements, expected 1")]
    DialectTranspile { expr: String, statements: usize },

    #[error("subplan not found: {0}")]
    SubplanNotFound(String),

    #[error("invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn malformed(node_type: impl Into<String>, field: &'static str) -> Self {
        Error::MalformedPlan {
            node_type: node_type.into(),
            field,
        }
    }

    /// Structural errors abort translation of the current plan.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::MalformedPlan { .. }
                | Error::UnsupportedJoinKind(_)
                | Error::InsufficientJoinOperands { .. }
                | Error::InsufficientSetOperands { .. }
                | Error::DuplicateJoinCondition { .. }
        )
    }
}
