#![forbid(unsafe_code)]
//! qepipe: translate PostgreSQL query execution plans into pipe-syntax SQL.
//!
//! The pipeline is parse → normalize → generate:
//! - `qepipe-core` parses `EXPLAIN (VERBOSE, FORMAT JSON)` output into
//!   [`QepNode`]s and defines the typed [`PlanNode`] tree
//! - `qepipe-normalize` rewrites raw nodes into canonical shape, backed by a
//!   [`Catalog`] and a dialect [`Transpiler`]
//! - `qepipe-pipesyntax` renders the typed tree as pipe-syntax SQL
//!
//! ```no_run
//! use qepipe::{translate, PassthroughTranspiler, StaticCatalog, TranslatorConfig};
//!
//! let catalog = StaticCatalog::from_yaml(&std::fs::read_to_string("catalog.yaml")?)?;
//! let explain = std::fs::read_to_string("plan.json")?;
//! let out = translate(&explain, &catalog, &PassthroughTranspiler, &TranslatorConfig::default())?;
//! println!("{}", out);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use qepipe_core::config::{SqlDialect, TranslatorConfig};
pub use qepipe_core::error::{Error, Result};
pub use qepipe_core::plan::PlanNode;
pub use qepipe_core::qep::QepNode;
pub use qepipe_normalize::{Catalog, Normalizer, PassthroughTranspiler, StaticCatalog, Transpiler};
pub use qepipe_pipesyntax::{PipeSyntax, Translation, Warning};

pub mod prelude {
    pub use qepipe_core::prelude::*;
    pub use qepipe_normalize::{Catalog, Normalizer, StaticCatalog, Transpiler};
    pub use qepipe_pipesyntax::{PipeSyntax, Translation, Warning};
}

use tracing::debug;

/// Collaborators and settings for translating any number of plans.
pub struct Translator<'a> {
    catalog: &'a dyn Catalog,
    transpiler: &'a dyn Transpiler,
    config: TranslatorConfig,
}

impl<'a> Translator<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        transpiler: &'a dyn Transpiler,
        config: TranslatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            transpiler,
            config,
        })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Normalize a raw plan into the typed tree.
    pub fn normalize(&self, raw: QepNode) -> Result<PlanNode> {
        Normalizer::standard(self.catalog, self.transpiler, &self.config).normalize(raw)
    }

    pub fn translate_plan(&self, raw: QepNode) -> Result<Translation> {
        let plan = self.normalize(raw)?;
        let out = PipeSyntax::with_config(self.config.clone()).generate(&plan)?;
        debug!(
            root = %plan.node_type,
            bytes = out.sql.len(),
            warnings = out.warnings.len(),
            "translated plan"
        );
        Ok(out)
    }

    pub fn translate_value(&self, explain: serde_json::Value) -> Result<Translation> {
        self.translate_plan(QepNode::from_explain_value(explain)?)
    }

    /// Translate `EXPLAIN (VERBOSE, FORMAT JSON)` output.
    pub fn translate(&self, explain: &str) -> Result<Translation> {
        self.translate_plan(QepNode::from_explain_json(explain)?)
    }
}

/// One-shot translation of `EXPLAIN (VERBOSE, FORMAT JSON)` output.
pub fn translate(
    explain: &str,
    catalog: &dyn Catalog,
    transpiler: &dyn Transpiler,
    config: &TranslatorConfig,
) -> Result<Translation> {
    Translator::new(catalog, transpiler, config.clone())?.translate(explain)
}
