//! Copy whichever dialect-specific join predicate a node carries into `join_on`.

use qepipe_core::error::{Error, Result};
use qepipe_core::qep::QepNode;

use crate::rewrite::{NodeContext, Rewrite};

pub struct JoinConditionCanonicalization;

impl Rewrite for JoinConditionCanonicalization {
    fn name(&self) -> &'static str {
        "join_condition"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        let mut conditions = [node.hash_cond.as_ref(), node.merge_cond.as_ref()]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>();
        if conditions.is_empty() {
            return Ok(node);
        }
        if node.join_on.is_some() || conditions.len() > 1 {
            return Err(Error::DuplicateJoinCondition {
                node_type: node.node_type,
            });
        }
        node.join_on = conditions.pop();
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::apply;

    #[test]
    fn hash_and_merge_conditions_become_join_on() {
        let mut hash = QepNode::new("Hash Join");
        hash.hash_cond = Some("(orders.o_custkey = customer.c_custkey)".into());
        let out = apply(hash, &JoinConditionCanonicalization).unwrap();
        assert_eq!(
            out.join_on.as_deref(),
            Some("(orders.o_custkey = customer.c_custkey)")
        );

        let mut merge = QepNode::new("Merge Join");
        merge.merge_cond = Some("(a.x = b.x)".into());
        let out = apply(merge, &JoinConditionCanonicalization).unwrap();
        assert_eq!(out.join_on.as_deref(), Some("(a.x = b.x)"));
    }

    #[test]
    fn existing_join_on_is_a_duplicate() {
        let mut hash = QepNode::new("Hash Join");
        hash.hash_cond = Some("(a.x = b.x)".into());
        hash.join_on = Some("(a.y = b.y)".into());
        let err = apply(hash, &JoinConditionCanonicalization).unwrap_err();
        assert!(matches!(err, Error::DuplicateJoinCondition { .. }));
    }

    #[test]
    fn running_twice_is_detected() {
        let mut hash = QepNode::new("Hash Join");
        hash.hash_cond = Some("(a.x = b.x)".into());
        let once = apply(hash, &JoinConditionCanonicalization).unwrap();
        assert!(apply(once, &JoinConditionCanonicalization).is_err());
    }

    #[test]
    fn nested_loops_have_no_join_on() {
        let mut nl = QepNode::new("Nested Loop");
        nl.join_filter = Some("(a.x < b.x)".into());
        let out = apply(nl, &JoinConditionCanonicalization).unwrap();
        assert_eq!(out.join_on, None);
    }
}
