//! Fold every predicate-bearing field into the canonical `filters` list.

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

use crate::rewrite::{NodeContext, Rewrite};

pub struct FilterCanonicalization;

impl Rewrite for FilterCanonicalization {
    fn name(&self) -> &'static str {
        "filters"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        // Engine field order; anything already in `filters` stays first.
        let predicates = [
            node.index_cond.as_ref(),
            node.recheck_cond.as_ref(),
            node.join_filter.as_ref(),
            node.filter.as_ref(),
            node.one_time_filter.as_ref(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>();
        node.filters.extend(predicates);
        Ok(node)
    }
}
