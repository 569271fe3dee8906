//! Make CTE scans look like ordinary relation scans.

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

use crate::rewrite::{NodeContext, Rewrite};

pub struct CteCanonicalization;

impl Rewrite for CteCanonicalization {
    fn name(&self) -> &'static str {
        "cte"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        if node.node_type == "CTE Scan" {
            if let Some(cte) = node.cte_name.as_ref() {
                node.relation_name = Some(cte.clone());
            }
        }
        Ok(node)
    }
}
