//! Subplan reference tokens inside expression text.
//!
//! The engine prints references to separately computed sub-queries as
//! `(SubPlan 2)` or `(hashed SubPlan 2)`. The normalizer quotes them as
//! `` `(SubPlan 2)` `` so the transpiler treats them as opaque identifiers; the
//! generator later locates the quoted form as structured [`SubplanRef`]s and
//! substitutes them in a single left-to-right pass.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::plan::SubplanKind;

/// Raw or already-quoted reference, with the optional `hashed` marker.
static ANY_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`?\((?:hashed\s+)?(InitPlan|SubPlan) (\d+)\)`?").expect("valid subplan regex")
});

/// Quoted reference as left behind by the normalizer.
static QUOTED_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`\((InitPlan|SubPlan) (\d+)\)`").expect("valid subplan regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubplanRef {
    pub kind: SubplanKind,
    /// Registry key, e.g. `"SubPlan 2"`.
    pub name: String,
}

impl SubplanRef {
    fn from_captures(caps: &Captures<'_>) -> Self {
        let kind = match &caps[1] {
            "InitPlan" => SubplanKind::InitPlan,
            _ => SubplanKind::SubPlan,
        };
        SubplanRef {
            kind,
            name: format!("{} {}", &caps[1], &caps[2]),
        }
    }

    /// Quoted token as it appears in normalized expressions.
    pub fn token(&self) -> String {
        format!("`({})`", self.name)
    }
}

/// A located reference inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpan {
    pub range: Range<usize>,
    pub reference: SubplanRef,
}

/// Rewrite every raw `(SubPlan N)` / `(hashed SubPlan N)` token into its quoted
/// form. Already-quoted tokens are left as they are.
pub fn quote_subplan_refs(expr: &str) -> String {
    ANY_REF
        .replace_all(expr, |caps: &Captures<'_>| {
            SubplanRef::from_captures(caps).token()
        })
        .into_owned()
}

/// Locate the quoted subplan references in `expr`, in order of appearance.
pub fn find_subplan_refs(expr: &str) -> Vec<RefSpan> {
    QUOTED_REF
        .captures_iter(expr)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            Some(RefSpan {
                range: m.range(),
                reference: SubplanRef::from_captures(&caps),
            })
        })
        .collect()
}

/// Replace each quoted reference with `resolve(reference)`; references for
/// which `resolve` returns `None` stay verbatim.
pub fn replace_subplan_refs<F>(expr: &str, mut resolve: F) -> String
where
    F: FnMut(&SubplanRef) -> Option<String>,
{
    let spans = find_subplan_refs(expr);
    if spans.is_empty() {
        return expr.to_string();
    }

    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&expr[last..span.range.start]);
        match resolve(&span.reference) {
            Some(sql) => out.push_str(&sql),
            None => out.push_str(&expr[span.range.clone()]),
        }
        last = span.range.end;
    }
    out.push_str(&expr[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_raw_and_hashed_refs() {
        assert_eq!(
            quote_subplan_refs("(x = ANY ((hashed SubPlan 1)))"),
            "(x = ANY (`(SubPlan 1)`))"
        );
        assert_eq!(quote_subplan_refs("(InitPlan 3)"), "`(InitPlan 3)`");
    }

    #[test]
    fn quoting_is_idempotent() {
        let once = quote_subplan_refs("(a > (SubPlan 2))");
        assert_eq!(quote_subplan_refs(&once), once);
    }

    #[test]
    fn finds_refs_in_order() {
        let spans = find_subplan_refs("`(InitPlan 1)` < `(SubPlan 2)`");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].reference.kind, SubplanKind::InitPlan);
        assert_eq!(spans[0].reference.name, "InitPlan 1");
        assert_eq!(spans[1].reference.name, "SubPlan 2");
        assert_eq!(spans[1].range.start, 17);
    }

    #[test]
    fn unresolved_refs_stay_verbatim() {
        let out = replace_subplan_refs("`(SubPlan 1)` + `(SubPlan 2)`", |r| {
            (r.name == "SubPlan 2").then(|| "(FROM t)".to_string())
        });
        assert_eq!(out, "`(SubPlan 1)` + (FROM t)");
    }

    #[test]
    fn replacement_text_is_not_rescanned() {
        let out = replace_subplan_refs("`(SubPlan 1)`", |_| Some("`(SubPlan 1)`x".into()));
        assert_eq!(out, "`(SubPlan 1)`x");
    }
}
