//! Attach the ordered key columns of the index a scan reads.

use qepipe_core::error::Result;
use qepipe_core::qep::QepNode;

use crate::catalog::Catalog;
use crate::rewrite::{NodeContext, Rewrite};

pub struct IndexKeyResolution<'a> {
    catalog: &'a dyn Catalog,
    default_schema: String,
}

impl<'a> IndexKeyResolution<'a> {
    pub fn new(catalog: &'a dyn Catalog, default_schema: impl Into<String>) -> Self {
        Self {
            catalog,
            default_schema: default_schema.into(),
        }
    }
}

impl Rewrite for IndexKeyResolution<'_> {
    fn name(&self) -> &'static str {
        "index_key"
    }

    fn rewrite(&self, mut node: QepNode, _ctx: &NodeContext<'_>) -> Result<QepNode> {
        // Keys supplied with the plan win; no lookup needed.
        if node.index_key.is_some() {
            return Ok(node);
        }
        if let Some(index) = node.index_name.as_deref() {
            let schema = node.schema.as_deref().unwrap_or(&self.default_schema);
            let key = self.catalog.get_index_key(index, schema)?;
            tracing::debug!(index, schema, ?key, "resolved index key");
            node.index_key = Some(key);
        }
        Ok(node)
    }
}
