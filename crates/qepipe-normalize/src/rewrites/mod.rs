//! The standard node rewrites, in the order the normalizer applies them.

pub mod alias;
pub mod cte;
pub mod dialect;
pub mod filters;
pub mod index_key;
pub mod join_condition;
pub mod subplan_name;

pub use alias::AliasPushUp;
pub use cte::CteCanonicalization;
pub use dialect::DialectRewrite;
pub use filters::FilterCanonicalization;
pub use index_key::IndexKeyResolution;
pub use join_condition::JoinConditionCanonicalization;
pub use subplan_name::SubplanNameNormalization;
