//! Local fix-ups around the generic transpiler.
//!
//! The transpiler does not know this system's conventions, so expressions are
//! prepared before and corrected after transpilation.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `(SubPlan 1).col1` → `(SubPlan 1)`: positional columns of a sub-query
/// result are planner artifacts with no meaning in the output.
static COLUMN_POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\)\.col\d+\b").expect("valid column position regex"));

/// `CAST('{a,b,c}' AS ARRAY<T>)`
static CASTED_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CAST\('\{([^}']*)\}' AS ARRAY<([^>]+)>\)").expect("valid array regex")
});

/// `x AS DESC`, `x AS "asc"`
static ORDER_MARKER_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+AS\s+[`"]?(ASC|DESC)\b[`"]?"#).expect("valid order marker regex")
});

pub fn strip_column_positions(expr: &str) -> String {
    COLUMN_POSITION.replace_all(expr, ")").into_owned()
}

/// Rewrite array literals transpiled as one casted string into a list of
/// individually casted scalars:
/// `CAST('{16,18}' AS ARRAY<INT64>)` → `[CAST(16 AS INT64), CAST(18 AS INT64)]`.
pub fn correct_sql_arrays(expr: &str) -> String {
    CASTED_ARRAY
        .replace_all(expr, |caps: &Captures<'_>| {
            let elem_type = caps[2].trim();
            let items = caps[1]
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| format!("CAST({} AS {})", array_element(item), elem_type))
                .collect::<Vec<_>>();
            format!("[{}]", items.join(", "))
        })
        .into_owned()
}

// Array elements the engine double-quotes (spaces, commas) become string literals.
fn array_element(item: &str) -> String {
    match item.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => format!("'{}'", inner.replace('\'', "\\'")),
        None => item.to_string(),
    }
}

/// Turn direction markers mis-rendered as column aliases back into keywords:
/// `customer.c_address AS DESC` → `customer.c_address DESC`.
pub fn correct_order_markers(expr: &str) -> String {
    ORDER_MARKER_ALIAS
        .replace_all(expr, |caps: &Captures<'_>| {
            format!(" {}", caps[1].to_ascii_uppercase())
        })
        .into_owned()
}
