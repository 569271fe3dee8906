//! Translate every scalar expression from the source to the target dialect.

use qepipe_core::config::SqlDialect;
use qepipe_core::error::{Error, Result};
use qepipe_core::expr::quote_subplan_refs;
use qepipe_core::qep::QepNode;

use crate::corrections::{correct_order_markers, correct_sql_arrays, strip_column_positions};
use crate::rewrite::{NodeContext, Rewrite};
use crate::transpile::Transpiler;

pub struct DialectRewrite<'a> {
    transpiler: &'a dyn Transpiler,
    source: SqlDialect,
    target: SqlDialect,
}

impl<'a> DialectRewrite<'a> {
    pub fn new(transpiler: &'a dyn Transpiler, source: SqlDialect, target: SqlDialect) -> Self {
        Self {
            transpiler,
            source,
            target,
        }
    }

    /// Prepare, transpile and correct a single expression.
    pub fn convert(&self, expr: &str) -> Result<String> {
        let prepared = quote_subplan_refs(&strip_column_positions(expr));
        let mut statements = self
            .transpiler
            .transpile(&prepared, self.source, self.target)?;
        if statements.len() != 1 {
            return Err(Error::DialectTranspile {
                expr: expr.to_string(),
                statements: statements.len(),
            });
        }
        let transpiled = statements.remove(0);
        Ok(correct_order_markers(&correct_sql_arrays(&transpiled)))
    }

    fn convert_opt(&self, expr: &mut Option<String>) -> Result<()> {
        if let Some(e) = expr {
            *e = self.convert(e)?;
        }
        Ok(())
    }

    fn convert_all(&self, exprs: &mut [String]) -> Result<()> {
        for e in exprs.iter_mut() {
            *e = self.convert(e)?;
        }
        Ok(())
    }
}

impl Rewrite for DialectRewrite<'_> {
    fn name(&self) -> &'static str {
        "dialect"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        self.convert_all(&mut node.output)?;
        self.convert_all(&mut node.sort_key)?;
        self.convert_all(&mut node.group_key)?;
        self.convert_all(&mut node.filters)?;
        for expr in [
            &mut node.filter,
            &mut node.index_cond,
            &mut node.recheck_cond,
            &mut node.join_filter,
            &mut node.one_time_filter,
            &mut node.hash_cond,
            &mut node.merge_cond,
            &mut node.join_on,
        ] {
            self.convert_opt(expr)?;
        }
        Ok(node)
    }
}
