//! Generator output: the SQL text plus recoverable diagnostics.

use std::fmt;

use serde::Serialize;

/// A recoverable condition met while generating; the SQL is still emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A subplan reference had no registry entry and was left verbatim.
    SubplanNotFound { name: String },
    /// A node kind the generator has no stage for; its children were used.
    UnrecognizedNode { node_type: String },
    /// A join carried more than two operand children.
    ExtraJoinOperands { node_type: String, ignored: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SubplanNotFound { name } => write!(f, "subplan {} not found", name),
            Warning::UnrecognizedNode { node_type } => {
                write!(f, "ignoring unrecognized node '{}'", node_type)
            }
            Warning::ExtraJoinOperands { node_type, ignored } => {
                write!(f, "'{}' join: ignoring {} extra operand(s)", node_type, ignored)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub sql: String,
    pub warnings: Vec<Warning>,
}

impl Translation {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
