#![forbid(unsafe_code)]
//! qepipe-normalize: rewrite raw `EXPLAIN` JSON trees into the canonical shape
//! the pipe-syntax generator expects.
//!
//! - `rewrite`: the `Rewrite` trait and the post-order traversal
//! - `rewrites`: the standard node rewrites
//! - `catalog` / `transpile`: external collaborators (index metadata, dialects)
//! - `corrections`: local fix-ups around the transpiler
//!
//! The standard pipeline runs, per node and in this order: index key
//! resolution, subplan name normalization, dialect rewrite, CTE
//! canonicalization, join condition and filter canonicalization, alias push-up.

pub mod catalog;
pub mod corrections;
pub mod rewrite;
pub mod rewrites;
pub mod transpile;

use tracing::debug;

use qepipe_core::config::TranslatorConfig;
use qepipe_core::error::Result;
use qepipe_core::plan::PlanNode;
use qepipe_core::qep::QepNode;

pub use catalog::{Catalog, StaticCatalog};
pub use rewrite::{apply, apply_all, canonical_subplan_name, FnRewrite, NodeContext, Rewrite};
pub use transpile::{PassthroughTranspiler, Transpiler};

use rewrites::{
    AliasPushUp, CteCanonicalization, DialectRewrite, FilterCanonicalization,
    IndexKeyResolution, JoinConditionCanonicalization, SubplanNameNormalization,
};

/// An ordered list of rewrites applied in one post-order pass.
#[derive(Default)]
pub struct Normalizer<'a> {
    rewrites: Vec<Box<dyn Rewrite + 'a>>,
}

impl<'a> Normalizer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewrite(mut self, rewrite: impl Rewrite + 'a) -> Self {
        self.rewrites.push(Box::new(rewrite));
        self
    }

    /// The standard pipeline backed by `catalog` and `transpiler`.
    pub fn standard(
        catalog: &'a dyn Catalog,
        transpiler: &'a dyn Transpiler,
        config: &TranslatorConfig,
    ) -> Self {
        Self::new()
            .with_rewrite(IndexKeyResolution::new(catalog, config.default_schema.clone()))
            .with_rewrite(SubplanNameNormalization)
            .with_rewrite(DialectRewrite::new(
                transpiler,
                config.source_dialect,
                config.target_dialect,
            ))
            .with_rewrite(CteCanonicalization)
            .with_rewrite(JoinConditionCanonicalization)
            .with_rewrite(FilterCanonicalization)
            .with_rewrite(AliasPushUp)
    }

    pub fn rewrite_names(&self) -> Vec<&'static str> {
        self.rewrites.iter().map(|r| r.name()).collect()
    }

    /// Run every rewrite over `plan`, returning the rewritten raw tree.
    pub fn rewrite(&self, plan: QepNode) -> Result<QepNode> {
        let rewrites: Vec<&dyn Rewrite> = self
            .rewrites
            .iter()
            .map(|r| r.as_ref() as &dyn Rewrite)
            .collect();
        debug!(
            nodes = plan.node_count(),
            rewrites = ?self.rewrite_names(),
            "normalizing plan"
        );
        apply_all(plan, &rewrites)
    }

    /// Rewrite `plan` and convert it into the typed tree.
    pub fn normalize(&self, plan: QepNode) -> Result<PlanNode> {
        let plan = PlanNode::try_from(self.rewrite(plan)?)?;
        debug!(root = %plan.node_type, "plan normalized");
        Ok(plan)
    }
}

/// Normalize `plan` with the standard pipeline.
pub fn normalize(
    plan: QepNode,
    catalog: &dyn Catalog,
    transpiler: &dyn Transpiler,
    config: &TranslatorConfig,
) -> Result<PlanNode> {
    Normalizer::standard(catalog, transpiler, config).normalize(plan)
}
