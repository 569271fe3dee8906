//! Push an unambiguous child alias up to ancestors that lack one.
//!
//! Lets the generator label intermediate stages (e.g. a `Hash` wrapping a
//! scan) with a meaningful table alias.

use std::collections::BTreeSet;

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

use crate::rewrite::{apply, NodeContext, Rewrite};

pub struct AliasPushUp;

impl Rewrite for AliasPushUp {
    fn name(&self) -> &'static str {
        "alias_push_up"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        if node.alias.is_some() {
            return Ok(node);
        }
        // Subplans are rendered on their own and do not label this stage.
        let operands = node.plans.iter().filter(|c| !c.is_subplan());
        let mut aliases = BTreeSet::new();
        for child in operands {
            match child.alias.as_deref() {
                Some(alias) => {
                    aliases.insert(alias);
                }
                None => return Ok(node),
            }
        }
        if aliases.len() == 1 {
            node.alias = aliases.into_iter().next().map(str::to_string);
        }
        Ok(node)
    }
}

/// Run alias push-up alone over a whole tree.
pub fn pushup_aliases(plan: QepNode) -> Result<QepNode> {
    apply(plan, &AliasPushUp)
}
