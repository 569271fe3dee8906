//! Convenient re-exports for downstream crates.

pub use crate::config::{SqlDialect, TranslatorConfig};
pub use crate::error::{Error, Result};
pub use crate::expr::{RefSpan, SubplanRef};
pub use crate::plan::{
    JoinType, NodeKind, ParentRelationship, PlanNode, ScanDirection, SetCommand, SubplanKind,
};
pub use crate::qep::QepNode;
