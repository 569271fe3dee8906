//! Pipe-syntax generation from a normalized plan tree.
//!
//! Generation runs in two passes over the tree:
//! 1. every InitPlan/SubPlan subtree is rendered into a parenthesized fragment
//!    and stored in the [`SubplanRegistry`];
//! 2. the main tree is rendered bottom-up, one chunk per node, with subplan
//!    references in expressions resolved against the registry.
//!
//! The top-level SQL is prefixed with a `WITH` preamble holding the InitPlans.

use std::collections::HashSet;

use tracing::{debug, warn};

use qepipe_core::config::TranslatorConfig;
use qepipe_core::error::{Error, Result};
use qepipe_core::plan::{JoinType, NodeKind, PlanNode, SetCommand};

use crate::chunk::{format_cost, parenthesize, pipe, Chunk};
use crate::registry::SubplanRegistry;
use crate::translation::{Translation, Warning};

#[derive(Debug, Default)]
pub struct PipeSyntax {
    config: TranslatorConfig,
    registry: SubplanRegistry,
    warnings: Vec<Warning>,
}

impl PipeSyntax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubplanRegistry {
        &self.registry
    }

    /// Warnings collected since the last [`PipeSyntax::generate`].
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Translate a whole plan. The registry and warnings start fresh on
    /// every call.
    pub fn generate(&mut self, plan: &PlanNode) -> Result<Translation> {
        self.registry = SubplanRegistry::new();
        self.warnings.clear();

        self.register_subplans(plan)?;
        let body = self.generate_node(plan)?;
        let sql = self.registry.with_preamble() + &body;
        debug!(
            root = %plan.node_type,
            subplans = self.registry.len(),
            warnings = self.warnings.len(),
            "generated pipe syntax"
        );
        Ok(Translation {
            sql,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    /// Render every InitPlan/SubPlan below (and including) `plan` into the
    /// registry.
    ///
    /// InitPlans keep pre-order positions in the `WITH` preamble; fragments
    /// are rendered deepest first so references between subplans resolve.
    pub fn register_subplans(&mut self, plan: &PlanNode) -> Result<()> {
        let mut pending = Vec::new();
        collect_subplans(plan, &mut pending);

        for node in &pending {
            if let (Some(kind), Some(name)) = (node.subplan_kind(), node.subplan_name.as_deref()) {
                self.registry.reserve(kind, name);
            }
        }
        for node in pending.into_iter().rev() {
            if let (Some(kind), Some(name)) = (node.subplan_kind(), node.subplan_name.as_deref()) {
                let fragment = self.render_subplan(node)?;
                self.registry.insert(kind, name, fragment);
            }
        }
        Ok(())
    }

    // The subplan's own subtree plus a closing projection, as `(\n...\n)`.
    fn render_subplan(&mut self, node: &PlanNode) -> Result<String> {
        let body = self.dispatch(node)?;
        let mut chunk = Chunk::new(node.total_cost);
        if !matches!(node.kind, NodeKind::Result) {
            chunk.push_opt(self.gen_projection(node)?);
        }
        Ok(parenthesize(&chunk.render(&body), self.config.indent_width))
    }

    /// Render `node` and its subtree. Subplan nodes render empty here; they
    /// were handled by [`PipeSyntax::register_subplans`].
    pub fn generate_node(&mut self, node: &PlanNode) -> Result<String> {
        if node.is_subplan() {
            return Ok(String::new());
        }
        self.dispatch(node)
    }

    fn dispatch(&mut self, node: &PlanNode) -> Result<String> {
        let sql = match &node.kind {
            NodeKind::Scan { .. } | NodeKind::IndexScan { .. } | NodeKind::BitmapIndexScan { .. } => {
                self.gen_scan(node)?
            }
            NodeKind::Aggregate { .. } => self.gen_aggregate(node)?,
            NodeKind::Sort { .. } => self.gen_orderby(node)?,
            NodeKind::Limit { .. } => self.gen_limit(node)?,
            NodeKind::Join { .. } => self.gen_join(node)?,
            NodeKind::SetOp { .. } => self.gen_setop(node)?,
            NodeKind::Unique => self.gen_unique(node)?,
            NodeKind::Result => self.gen_result(node)?,
            NodeKind::Hash => self.gen_nested(node)?.concat(),
            NodeKind::Unrecognized { node_type } => {
                warn!(node = %node_type, "ignoring unrecognized node");
                self.warnings.push(Warning::UnrecognizedNode {
                    node_type: node_type.clone(),
                });
                self.gen_nested(node)?.concat()
            }
        };
        debug!(node = %node.node_type, cost = node.total_cost, "generated chunk");
        Ok(sql)
    }

    fn gen_nested(&mut self, node: &PlanNode) -> Result<Vec<String>> {
        node.children
            .iter()
            .map(|child| self.generate_node(child))
            .collect()
    }

    /// Replace the subplan references in `expr`. Unresolved references stay
    /// verbatim with a warning, or fail under `strict_subplans`.
    pub fn resolve_subplan(&mut self, expr: &str) -> Result<String> {
        let resolved = self.registry.resolve(expr);
        for name in resolved.missing {
            if self.config.strict_subplans {
                return Err(Error::SubplanNotFound(name));
            }
            warn!(subplan = %name, "subplan not found");
            self.warnings.push(Warning::SubplanNotFound { name });
        }
        Ok(resolved.sql)
    }

    fn resolve_all(&mut self, exprs: &[String]) -> Result<Vec<String>> {
        exprs.iter().map(|e| self.resolve_subplan(e)).collect()
    }

    /// `SELECT <output>`, or nothing when the node records no output.
    pub fn gen_projection(&mut self, node: &PlanNode) -> Result<Option<String>> {
        if node.output.is_empty() {
            return Ok(None);
        }
        let columns = self.resolve_all(&node.output)?;
        let select = match node.kind {
            NodeKind::Unique => "SELECT DISTINCT",
            _ => "SELECT",
        };
        Ok(Some(format!("{} {}", select, columns.join(", "))))
    }

    /// One `WHERE` stage over all filters. Each filter is already
    /// parenthesized, so `AND` keeps precedence.
    pub fn gen_filters(&mut self, node: &PlanNode) -> Result<Option<String>> {
        if node.filters.is_empty() {
            return Ok(None);
        }
        let filters = self.resolve_all(&node.filters)?;
        Ok(Some(format!("WHERE {}", filters.join(" AND "))))
    }

    fn from_clause(&self, relation: &str, schema: Option<&str>, alias: Option<&str>) -> String {
        let table = match schema {
            Some(schema) if self.config.qualify_relations => format!("`{}`.`{}`", schema, relation),
            _ => format!("`{}`", relation),
        };
        match alias {
            Some(alias) => format!("FROM {} AS `{}`", table, alias),
            None => format!("FROM {}", table),
        }
    }

    pub fn gen_scan(&mut self, node: &PlanNode) -> Result<String> {
        let (relation, schema, order) = match &node.kind {
            NodeKind::Scan { relation, schema } => (relation, schema, None),
            NodeKind::IndexScan {
                relation,
                schema,
                index_key,
                direction,
                ..
            } => {
                // Index scans return rows in index order.
                let order = direction
                    .keyword()
                    .map(|dir| format!("ORDER BY {} {}", index_key.join(", "), dir));
                (relation, schema, order)
            }
            // Only narrows rows for the heap recheck above it.
            NodeKind::BitmapIndexScan { .. } => return Ok(String::new()),
            _ => return Err(Error::malformed(&node.node_type, "Relation Name")),
        };

        let in_sql = self.gen_nested(node)?.concat();
        let mut chunk = Chunk::new(node.total_cost);
        chunk.push(self.from_clause(relation, schema.as_deref(), node.alias.as_deref()));
        chunk.push_opt(self.gen_filters(node)?);
        chunk.push_opt(self.gen_projection(node)?);
        chunk.push_opt(order);
        Ok(chunk.render(&in_sql))
    }

    pub fn gen_aggregate(&mut self, node: &PlanNode) -> Result<String> {
        let group_key: &[String] = match &node.kind {
            NodeKind::Aggregate { group_key, .. } => group_key,
            _ => &[],
        };

        // Output lists the grouping keys first; AGGREGATE takes only the
        // aggregate expressions.
        let mut keys = HashSet::new();
        for key in group_key {
            keys.insert(key.as_str());
            if let Some((_, column)) = key.rsplit_once('.') {
                keys.insert(column);
            }
        }
        let aggregates = node
            .output
            .iter()
            .filter(|o| !keys.contains(o.as_str()))
            .cloned()
            .collect::<Vec<_>>();

        let in_sql = self.gen_nested(node)?.concat();
        let mut stage = String::from("AGGREGATE");
        if !aggregates.is_empty() {
            stage.push(' ');
            stage.push_str(&self.resolve_all(&aggregates)?.join(", "));
        }
        if !group_key.is_empty() {
            stage.push_str(" GROUP BY ");
            stage.push_str(&self.resolve_all(group_key)?.join(", "));
        }

        let mut chunk = Chunk::new(node.total_cost);
        chunk.push(stage);
        // HAVING
        chunk.push_opt(self.gen_filters(node)?);
        Ok(chunk.render(&in_sql))
    }

    pub fn gen_orderby(&mut self, node: &PlanNode) -> Result<String> {
        let sort_key: &[String] = match &node.kind {
            NodeKind::Sort { sort_key } => sort_key,
            _ => &[],
        };

        let in_sql = self.gen_nested(node)?.concat();
        let mut chunk = Chunk::new(node.total_cost);
        chunk.push_opt(self.gen_filters(node)?);
        chunk.push_opt(self.gen_projection(node)?);
        if !sort_key.is_empty() {
            chunk.push(format!("ORDER BY {}", self.resolve_all(sort_key)?.join(", ")));
        }
        Ok(chunk.render(&in_sql))
    }

    /// `LIMIT` carries the planner's row estimate, not the literal limit.
    pub fn gen_limit(&mut self, node: &PlanNode) -> Result<String> {
        let rows = match node.kind {
            NodeKind::Limit { row_estimate } => row_estimate.max(0.0).ceil() as u64,
            _ => return Err(Error::malformed(&node.node_type, "Plan Rows")),
        };

        let in_sql = self.gen_nested(node)?.concat();
        let mut chunk = Chunk::new(node.total_cost);
        chunk.push(format!("LIMIT {}", rows));
        chunk.push_opt(self.gen_projection(node)?);
        Ok(chunk.render(&in_sql))
    }

    pub fn gen_join(&mut self, node: &PlanNode) -> Result<String> {
        let (join_type, join_on) = match &node.kind {
            NodeKind::Join { join_type, join_on } => (*join_type, join_on.as_deref()),
            _ => return Err(Error::malformed(&node.node_type, "Join Type")),
        };

        let mut operands = node
            .children
            .iter()
            .filter(|c| !c.is_subplan())
            .chain(node.children.iter().filter(|c| c.is_subplan()))
            .collect::<Vec<_>>();
        if operands.len() < 2 {
            return Err(Error::InsufficientJoinOperands {
                found: operands.len(),
            });
        }
        if operands.len() > 2 {
            let ignored = operands.len() - 2;
            warn!(node = %node.node_type, ignored, "ignoring extra join operands");
            self.warnings.push(Warning::ExtraJoinOperands {
                node_type: node.node_type.clone(),
                ignored,
            });
            operands.truncate(2);
        }
        let (lhs, rhs) = (operands[0], operands[1]);

        let width = self.config.indent_width;
        let lhs_sql = self.generate_node(lhs)?;
        let rhs_sql = self.generate_node(rhs)?;
        let condition = join_on.map(|c| self.resolve_subplan(c)).transpose()?;

        let (join_stage, trailing_filters) = if join_type.is_existence_test() {
            // The inner alias is only in scope inside the EXISTS, so the
            // condition and every join filter go there.
            let mut predicates = condition.into_iter().collect::<Vec<_>>();
            predicates.extend(self.resolve_all(&node.filters)?);
            let mut inner = rhs_sql;
            if let Some(alias) = &rhs.alias {
                inner = pipe(&inner, &format!("AS `{}`", alias));
            }
            if !predicates.is_empty() {
                inner = pipe(&inner, &format!("WHERE {}", predicates.join(" AND ")));
            }
            let stage = format!(
                "FROM {}{}\n|> {} {}",
                parenthesize(&lhs_sql, width),
                alias_suffix(lhs),
                join_type.keyword(),
                parenthesize(&inner, width),
            );
            (stage, None)
        } else {
            let keyword = match (join_type, &condition) {
                (JoinType::Inner, None) => "CROSS JOIN",
                _ => join_type.keyword(),
            };
            let on = condition
                .map(|c| format!(" ON {}", c))
                .unwrap_or_default();
            let stage = format!(
                "FROM {}{}\n|> {} {}{}{}",
                parenthesize(&lhs_sql, width),
                alias_suffix(lhs),
                keyword,
                parenthesize(&rhs_sql, width),
                alias_suffix(rhs),
                on,
            );
            (stage, self.gen_filters(node)?)
        };

        let mut chunk = Chunk::new(node.total_cost);
        chunk.push(join_stage);
        chunk.push_opt(trailing_filters);
        chunk.push_opt(self.gen_projection(node)?);
        Ok(chunk.render(""))
    }

    pub fn gen_setop(&mut self, node: &PlanNode) -> Result<String> {
        let (command, all, strategy) = match &node.kind {
            NodeKind::SetOp {
                command,
                all,
                strategy,
            } => (*command, *all, strategy.as_deref()),
            _ => return Err(Error::malformed(&node.node_type, "Command")),
        };

        let mut operands = node
            .children
            .iter()
            .filter(|c| !c.is_subplan())
            .collect::<Vec<_>>();
        // SetOp sits on top of an Append holding the actual inputs.
        if operands.len() == 1
            && matches!(
                operands[0].kind,
                NodeKind::SetOp {
                    command: SetCommand::Append,
                    ..
                }
            )
        {
            let append = operands[0];
            operands = append.children.iter().filter(|c| !c.is_subplan()).collect();
        }
        if operands.len() < 2 {
            return Err(Error::InsufficientSetOperands {
                found: operands.len(),
            });
        }

        let mut operator = set_operator(command, all);
        if strategy.map_or(false, |s| s.eq_ignore_ascii_case("hashed")) {
            operator.push_str("  -- hashed");
        }

        let width = self.config.indent_width;
        let parts = operands
            .into_iter()
            .map(|operand| -> Result<String> {
                Ok(parenthesize(&self.generate_node(operand)?, width))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "{}\n-- cost: {}\n",
            parts.join(&format!("\n{}\n", operator)),
            format_cost(node.total_cost)
        ))
    }

    pub fn gen_unique(&mut self, node: &PlanNode) -> Result<String> {
        let in_sql = self.gen_nested(node)?.concat();
        let mut chunk = Chunk::new(node.total_cost);
        chunk.push_opt(self.gen_filters(node)?);
        chunk.push_opt(self.gen_projection(node)?);
        Ok(chunk.render(&in_sql))
    }

    /// Constant projection; `SELECT NULL` when nothing is projected.
    pub fn gen_result(&mut self, node: &PlanNode) -> Result<String> {
        let in_sql = self.gen_nested(node)?.concat();
        let select = match self.gen_projection(node)? {
            Some(select) => select,
            None => "SELECT NULL".to_string(),
        };
        let filters = self.gen_filters(node)?;

        let mut chunk = Chunk::new(node.total_cost);
        if in_sql.is_empty() {
            // A pipe query cannot start with WHERE.
            chunk.push(select).push_opt(filters);
        } else {
            chunk.push_opt(filters).push(select);
        }
        Ok(chunk.render(&in_sql))
    }
}

fn collect_subplans<'a>(node: &'a PlanNode, out: &mut Vec<&'a PlanNode>) {
    if node.is_subplan() {
        out.push(node);
    }
    for child in &node.children {
        collect_subplans(child, out);
    }
}

fn alias_suffix(node: &PlanNode) -> String {
    node.alias
        .as_deref()
        .map(|a| format!(" AS `{}`", a))
        .unwrap_or_default()
}

fn set_operator(command: SetCommand, all: bool) -> String {
    let base = match command {
        SetCommand::Append => return "UNION ALL".to_string(),
        SetCommand::Union => "UNION",
        SetCommand::Intersect => "INTERSECT",
        SetCommand::Except => "EXCEPT",
    };
    if all {
        format!("{} ALL", base)
    } else {
        base.to_string()
    }
}

/// Translate `plan` with a fresh generator.
pub fn generate(plan: &PlanNode, config: &TranslatorConfig) -> Result<Translation> {
    PipeSyntax::with_config(config.clone()).generate(plan)
}
