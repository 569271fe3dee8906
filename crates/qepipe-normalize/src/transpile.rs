//! Dialect transpiler collaborator.
//!
//! The normalizer hands every scalar expression to a generic SQL transpiler and
//! then applies local corrections (see `corrections`). The transpiler itself is
//! external; `PassthroughTranspiler` serves plans whose expressions are already
//! written in the target dialect.

use qepipe_core::config::SqlDialect;
use qepipe_core::error::Result;

pub trait Transpiler {
    /// Rewrite `expr` from `source` into `target`, returning one string per
    /// output statement. The normalizer rejects any count other than one.
    fn transpile(&self, expr: &str, source: SqlDialect, target: SqlDialect) -> Result<Vec<String>>;
}

impl<F> Transpiler for F
where
    F: Fn(&str, SqlDialect, SqlDialect) -> Result<Vec<String>>,
{
    fn transpile(&self, expr: &str, source: SqlDialect, target: SqlDialect) -> Result<Vec<String>> {
        self(expr, source, target)
    }
}

/// Identity transpiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranspiler;

impl Transpiler for PassthroughTranspiler {
    fn transpile(&self, expr: &str, _source: SqlDialect, _target: SqlDialect) -> Result<Vec<String>> {
        Ok(vec![expr.to_string()])
    }
}
