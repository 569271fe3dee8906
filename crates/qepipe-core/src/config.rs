//! Translator configuration that downstream crates can serialize/deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// SQL dialects known to the expression transpiler boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Postgres,
    GoogleSql,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => f.write_str("postgres"),
            SqlDialect::GoogleSql => f.write_str("googlesql"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "googlesql" | "bigquery" | "zetasql" => Ok(SqlDialect::GoogleSql),
            other => Err(Error::Config(format!("unknown SQL dialect '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Dialect the plan's scalar expressions are written in.
    pub source_dialect: SqlDialect,

    /// Dialect the generated pipe-syntax SQL uses for scalar expressions.
    pub target_dialect: SqlDialect,

    /// Schema used for catalog lookups when a node does not name one.
    pub default_schema: String,

    /// Emit `` `schema`.`relation` `` in FROM stages when a schema is known.
    pub qualify_relations: bool,

    /// Spaces used when nesting a chunk inside another statement.
    pub indent_width: usize,

    /// Treat an unresolvable subplan reference as an error instead of a warning.
    pub strict_subplans: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_dialect: SqlDialect::Postgres,
            target_dialect: SqlDialect::GoogleSql,
            default_schema: "public".to_string(),
            qualify_relations: false,
            indent_width: 2,
            strict_subplans: false,
        }
    }
}

impl TranslatorConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QEPIPE_SOURCE_DIALECT`: dialect of plan expressions
    /// - `QEPIPE_TARGET_DIALECT`: dialect of generated expressions
    /// - `QEPIPE_DEFAULT_SCHEMA`: schema for catalog lookups
    /// - `QEPIPE_QUALIFY_RELATIONS`: `true`/`false`
    /// - `QEPIPE_INDENT_WIDTH`: nesting indent in spaces
    /// - `QEPIPE_STRICT_SUBPLANS`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QEPIPE_SOURCE_DIALECT") {
            if let Ok(v) = s.parse::<SqlDialect>() {
                cfg.source_dialect = v;
            }
        }

        if let Ok(s) = std::env::var("QEPIPE_TARGET_DIALECT") {
            if let Ok(v) = s.parse::<SqlDialect>() {
                cfg.target_dialect = v;
            }
        }

        if let Ok(s) = std::env::var("QEPIPE_DEFAULT_SCHEMA") {
            if !s.trim().is_empty() {
                cfg.default_schema = s.trim().to_string();
            }
        }

        if let Ok(s) = std::env::var("QEPIPE_QUALIFY_RELATIONS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.qualify_relations = v;
            }
        }

        if let Ok(s) = std::env::var("QEPIPE_INDENT_WIDTH") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.indent_width = v;
            }
        }

        if let Ok(s) = std::env::var("QEPIPE_STRICT_SUBPLANS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.strict_subplans = v;
            }
        }

        cfg
    }

    /// Validate the config for obvious misconfigurations.
    pub fn validate(&self) -> Result<(), Error> {
        if self.default_schema.trim().is_empty() {
            return Err(Error::Config("default_schema must not be empty".into()));
        }
        if self.indent_width > 16 {
            return Err(Error::Config(format!(
                "indent_width {} is out of range (max 16)",
                self.indent_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_googlesql_from_postgres() {
        let cfg = TranslatorConfig::default();
        assert_eq!(cfg.source_dialect, SqlDialect::Postgres);
        assert_eq!(cfg.target_dialect, SqlDialect::GoogleSql);
        assert_eq!(cfg.default_schema, "public");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn dialect_aliases_parse() {
        assert_eq!("PostgreSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert_eq!("bigquery".parse::<SqlDialect>().unwrap(), SqlDialect::GoogleSql);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: TranslatorConfig =
            serde_json::from_str(r#"{"qualify_relations": true}"#).unwrap();
        assert!(cfg.qualify_relations);
        assert_eq!(cfg.indent_width, 2);
    }

    // Each env test owns distinct variables; tests run on parallel threads.
    #[test]
    fn env_overrides_apply() {
        std::env::set_var("QEPIPE_QUALIFY_RELATIONS", "true");
        std::env::set_var("QEPIPE_INDENT_WIDTH", "4");
        let cfg = TranslatorConfig::from_env();
        std::env::remove_var("QEPIPE_QUALIFY_RELATIONS");
        std::env::remove_var("QEPIPE_INDENT_WIDTH");

        assert!(cfg.qualify_relations);
        assert_eq!(cfg.indent_width, 4);
        assert_eq!(cfg.default_schema, "public");
    }

    #[test]
    fn unparsable_env_values_keep_defaults() {
        std::env::set_var("QEPIPE_STRICT_SUBPLANS", "sometimes");
        std::env::set_var("QEPIPE_TARGET_DIALECT", "cobol");
        let cfg = TranslatorConfig::from_env();
        std::env::remove_var("QEPIPE_STRICT_SUBPLANS");
        std::env::remove_var("QEPIPE_TARGET_DIALECT");

        assert!(!cfg.strict_subplans);
        assert_eq!(cfg.target_dialect, SqlDialect::GoogleSql);
    }

    #[test]
    fn empty_schema_is_rejected() {
        let cfg = TranslatorConfig {
            default_schema: " ".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
