//! Node-level rewrite interface and the post-order traversal that drives it.

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

/// Per-node traversal context handed to every rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContext<'a> {
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Canonical name of the nearest enclosing InitPlan/SubPlan, the node
    /// itself included.
    pub subplan: Option<&'a str>,
}

/// A pure node rewrite.
///
/// Invariants:
/// - Children of `node` have already been rewritten (post-order).
/// - A rewrite only touches `node`'s own fields; it may read but must not
///   restructure `node.plans`.
pub trait Rewrite {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn rewrite(&self, node: QepNode, ctx: &NodeContext<'_>) -> Result<QepNode>;
}

/// Adapter turning a closure into a [`Rewrite`].
pub struct FnRewrite<F> {
    name: &'static str,
    f: F,
}

impl<F> FnRewrite<F>
where
    F: Fn(QepNode, &NodeContext<'_>) -> Result<QepNode>,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Rewrite for FnRewrite<F>
where
    F: Fn(QepNode, &NodeContext<'_>) -> Result<QepNode>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn rewrite(&self, node: QepNode, ctx: &NodeContext<'_>) -> Result<QepNode> {
        (self.f)(node, ctx)
    }
}

/// Strip non-standard prefixes (`"CTE revenue0"` → `"revenue0"`) so every
/// name-based lookup uses one format.
pub fn canonical_subplan_name(name: &str) -> String {
    name.strip_prefix("CTE ").unwrap_or(name).trim().to_string()
}

/// Apply `rewrites`, in order, to every node of `plan` in a single post-order
/// depth-first traversal.
pub fn apply_all(plan: QepNode, rewrites: &[&dyn Rewrite]) -> Result<QepNode> {
    fn dfs(
        mut node: QepNode,
        depth: usize,
        enclosing: Option<&str>,
        rewrites: &[&dyn Rewrite],
    ) -> Result<QepNode> {
        let own = if node.is_subplan() {
            node.subplan_name.as_deref().map(canonical_subplan_name)
        } else {
            None
        };
        let scope = own.as_deref().or(enclosing);

        let children = std::mem::take(&mut node.plans);
        node.plans = children
            .into_iter()
            .map(|child| dfs(child, depth + 1, scope, rewrites))
            .collect::<Result<Vec<_>>>()?;

        let ctx = NodeContext {
            depth,
            subplan: scope,
        };
        for rewrite in rewrites {
            node = rewrite.rewrite(node, &ctx)?;
            tracing::trace!(rewrite = rewrite.name(), node = %node.node_type, depth, "applied rewrite");
        }
        Ok(node)
    }

    dfs(plan, 0, None, rewrites)
}

/// Apply a single rewrite over the whole tree.
pub fn apply(plan: QepNode, rewrite: &dyn Rewrite) -> Result<QepNode> {
    apply_all(plan, &[rewrite])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn tree() -> QepNode {
        let mut leaf = QepNode::new("Seq Scan");
        leaf.alias = Some("t".into());
        let mut sub = QepNode::new("Aggregate");
        sub.parent_relationship = Some("SubPlan".into());
        sub.subplan_name = Some("CTE totals".into());
        sub.plans.push(leaf.clone());
        let mut root = QepNode::new("Hash Join");
        root.plans = vec![leaf, sub];
        root
    }

    #[test]
    fn visits_post_order_with_depth_and_scope() {
        let seen = RefCell::new(Vec::new());
        let record = FnRewrite::new("record", |node: QepNode, ctx: &NodeContext<'_>| {
            seen.borrow_mut().push((
                node.node_type.clone(),
                ctx.depth,
                ctx.subplan.map(str::to_string),
            ));
            Ok(node)
        });
        apply(tree(), &record).unwrap();

        assert_eq!(
            seen.into_inner(),
            vec![
                ("Seq Scan".to_string(), 1, None),
                ("Seq Scan".to_string(), 2, Some("totals".to_string())),
                ("Aggregate".to_string(), 1, Some("totals".to_string())),
                ("Hash Join".to_string(), 0, None),
            ]
        );
    }

    #[test]
    fn rewrites_run_in_list_order() {
        let first = FnRewrite::new("first", |mut node: QepNode, _: &NodeContext<'_>| {
            node.output.push("a".into());
            Ok(node)
        });
        let second = FnRewrite::new("second", |mut node: QepNode, _: &NodeContext<'_>| {
            node.output.push("b".into());
            Ok(node)
        });
        let out = apply_all(QepNode::new("Result"), &[&first, &second]).unwrap();
        assert_eq!(out.output, vec!["a", "b"]);
    }

    #[test]
    fn errors_abort_traversal() {
        let fail = FnRewrite::new("fail", |node: QepNode, _: &NodeContext<'_>| {
            Err(qepipe_core::Error::malformed(node.node_type, "Output"))
        });
        assert!(apply(tree(), &fail).is_err());
    }

    #[test]
    fn canonical_names_drop_cte_prefix() {
        assert_eq!(canonical_subplan_name("CTE revenue0"), "revenue0");
        assert_eq!(canonical_subplan_name("SubPlan 1"), "SubPlan 1");
    }
}
