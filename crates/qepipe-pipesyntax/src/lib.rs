#![forbid(unsafe_code)]
//! qepipe-pipesyntax: render a normalized plan tree as pipe-syntax SQL.
//!
//! - `chunk`: stage chaining, cost comments, indentation
//! - `registry`: rendered InitPlan/SubPlan fragments
//! - `generator`: the two-pass generator
//! - `translation`: output text plus recoverable warnings

pub mod chunk;
pub mod generator;
pub mod registry;
pub mod translation;

pub use chunk::{format_cost, gen_chunk, indent, Chunk};
pub use generator::{generate, PipeSyntax};
pub use registry::{Resolved, SubplanRegistry};
pub use translation::{Translation, Warning};
