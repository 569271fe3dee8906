//! Canonicalize `Subplan Name` so later lookups use one format.

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

use crate::rewrite::{canonical_subplan_name, NodeContext, Rewrite};

pub struct SubplanNameNormalization;

impl Rewrite for SubplanNameNormalization {
    fn name(&self) -> &'static str {
        "subplan_name"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        if let Some(name) = node.subplan_name.take() {
            node.subplan_name = Some(canonical_subplan_name(&name));
        }
        Ok(node)
    }
}
