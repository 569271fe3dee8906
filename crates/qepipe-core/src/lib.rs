#![forbid(unsafe_code)]
//! qepipe-core: plan node types shared by the normalizer and the generator.
//!
//! - `qep`: raw nodes as they come out of `EXPLAIN (VERBOSE, FORMAT JSON)`
//! - `plan`: the typed, kind-checked tree the generator consumes
//! - `expr`: subplan reference tokens inside expression text
//! - `config` / `error`: translator settings and the error taxonomy
//!
//! No I/O here; catalog and transpiler collaborators live in `qepipe-normalize`.

pub mod config;
pub mod error;
pub mod expr;
pub mod plan;
pub mod prelude;
pub mod qep;

pub use error::{Error, Result};
