//! Catalog collaborator: index and primary-key column lookups.
//!
//! In production this is backed by the source database's system catalog; the
//! normalizer only needs the two lookups below. `StaticCatalog` serves them
//! from an in-memory map, loadable from a YAML/JSON fixture:
//!
//! ```yaml
//! schemas:
//!   public:
//!     indexes:
//!       customer_pkey: [c_custkey]
//!       idx_lineitem_part_supp: [l_partkey, l_suppkey]
//!     primary_keys:
//!       customer: c_custkey
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use qepipe_core::error::{Error, Result};

/// Synchronous, blocking catalog lookups. Each call returns exactly one result
/// or fails with `Error::CatalogLookup` when the object does not exist.
pub trait Catalog {
    /// Ordered key columns of `index` in `schema`.
    fn get_index_key(&self, index: &str, schema: &str) -> Result<Vec<String>>;

    /// Primary-key column of `relation` in `schema`.
    fn get_primary_key(&self, relation: &str, schema: &str) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub indexes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub primary_keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaCatalog>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index<I, S>(mut self, schema: &str, index: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas
            .entry(schema.to_string())
            .or_default()
            .indexes
            .insert(index.to_string(), columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_primary_key(mut self, schema: &str, relation: &str, column: &str) -> Self {
        self.schemas
            .entry(schema.to_string())
            .or_default()
            .primary_keys
            .insert(relation.to_string(), column.to_string());
        self
    }

    pub fn from_yaml(src: &str) -> Result<Self> {
        serde_yaml::from_str(src).map_err(|e| Error::Config(format!("invalid catalog YAML: {}", e)))
    }

    pub fn from_json(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src)?)
    }

    fn schema(&self, object: &str, schema: &str) -> Result<&SchemaCatalog> {
        self.schemas.get(schema).ok_or_else(|| Error::CatalogLookup {
            object: object.to_string(),
            schema: schema.to_string(),
            reason: "unknown schema".into(),
        })
    }
}

impl Catalog for StaticCatalog {
    fn get_index_key(&self, index: &str, schema: &str) -> Result<Vec<String>> {
        let columns = self
            .schema(index, schema)?
            .indexes
            .get(index)
            .filter(|cols| !cols.is_empty())
            .ok_or_else(|| Error::CatalogLookup {
                object: index.to_string(),
                schema: schema.to_string(),
                reason: "unknown index".into(),
            })?;
        Ok(columns.clone())
    }

    fn get_primary_key(&self, relation: &str, schema: &str) -> Result<String> {
        self.schema(relation, schema)?
            .primary_keys
            .get(relation)
            .cloned()
            .ok_or_else(|| Error::CatalogLookup {
                object: relation.to_string(),
                schema: schema.to_string(),
                reason: "no primary key".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
schemas:
  public:
    indexes:
      customer_pkey: [c_custkey]
      idx_lineitem_part_supp: [l_partkey, l_suppkey]
    primary_keys:
      customer: c_custkey
"#;

    #[test]
    fn yaml_fixture_serves_lookups() {
        let catalog = StaticCatalog::from_yaml(FIXTURE).unwrap();
        assert_eq!(
            catalog
                .get_index_key("idx_lineitem_part_supp", "public")
                .unwrap(),
            vec!["l_partkey", "l_suppkey"]
        );
        assert_eq!(
            catalog.get_primary_key("customer", "public").unwrap(),
            "c_custkey"
        );
    }

    #[test]
    fn unknown_objects_fail() {
        let catalog = StaticCatalog::new().with_index("public", "orders_pkey", ["o_orderkey"]);
        let err = catalog.get_index_key("nope", "public").unwrap_err();
        assert!(matches!(err, Error::CatalogLookup { ref reason, .. } if reason == "unknown index"));
        assert!(catalog.get_index_key("orders_pkey", "tpch").is_err());
        assert!(catalog.get_primary_key("orders", "public").is_err());
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        assert!(matches!(
            StaticCatalog::from_yaml("schemas: [").unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn builder_and_json_agree() {
        let built = StaticCatalog::new()
            .with_index("public", "customer_pkey", ["c_custkey"])
            .with_primary_key("public", "customer", "c_custkey");
        let json = serde_json::to_string(&built).unwrap();
        assert_eq!(StaticCatalog::from_json(&json).unwrap(), built);
    }
}
