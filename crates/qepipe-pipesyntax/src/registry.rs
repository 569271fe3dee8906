//! Rendered InitPlan/SubPlan fragments, keyed by subplan name.
//!
//! SubPlan fragments are inlined where an expression references them;
//! InitPlan fragments are hoisted into a `WITH` preamble and referenced by
//! name.

use std::collections::BTreeMap;

use qepipe_core::expr::{replace_subplan_refs, SubplanRef};
use qepipe_core::plan::SubplanKind;

/// Outcome of resolving the subplan references inside one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub sql: String,
    /// Names of references with no registry entry, left verbatim in `sql`.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubplanRegistry {
    // Registration order; `None` until the fragment is rendered.
    init_plans: Vec<(String, Option<String>)>,
    sub_plans: BTreeMap<String, String>,
}

impl SubplanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a position in the `WITH` preamble before the fragment exists.
    pub fn reserve(&mut self, kind: SubplanKind, name: &str) {
        if kind == SubplanKind::InitPlan && !self.has_init_plan(name) {
            self.init_plans.push((name.to_string(), None));
        }
    }

    /// Store a rendered fragment; re-registering a name replaces it in place.
    pub fn insert(&mut self, kind: SubplanKind, name: &str, fragment: String) {
        tracing::trace!(%kind, name, "registered subplan");
        match kind {
            SubplanKind::SubPlan => {
                self.sub_plans.insert(name.to_string(), fragment);
            }
            SubplanKind::InitPlan => {
                match self.init_plans.iter_mut().find(|(n, _)| n == name) {
                    Some(slot) => slot.1 = Some(fragment),
                    None => self.init_plans.push((name.to_string(), Some(fragment))),
                }
            }
        }
    }

    fn has_init_plan(&self, name: &str) -> bool {
        self.init_plans.iter().any(|(n, _)| n == name)
    }

    /// Rendered fragment for `kind`/`name`.
    pub fn fragment(&self, kind: SubplanKind, name: &str) -> Option<&str> {
        match kind {
            SubplanKind::SubPlan => self.sub_plans.get(name).map(String::as_str),
            SubplanKind::InitPlan => self
                .init_plans
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, f)| f.as_deref()),
        }
    }

    /// SQL text a reference expands to: SubPlans inline their fragment,
    /// InitPlans select from their `WITH` entry.
    pub fn expansion(&self, reference: &SubplanRef) -> Option<String> {
        match reference.kind {
            SubplanKind::SubPlan => self.sub_plans.get(&reference.name).cloned(),
            SubplanKind::InitPlan => self
                .has_init_plan(&reference.name)
                .then(|| format!("(FROM `{}`)", reference.name)),
        }
    }

    /// Replace every quoted subplan reference in `expr`.
    pub fn resolve(&self, expr: &str) -> Resolved {
        let mut missing = Vec::new();
        let sql = replace_subplan_refs(expr, |reference| {
            let expansion = self.expansion(reference);
            if expansion.is_none() {
                missing.push(reference.name.clone());
            }
            expansion
        });
        Resolved { sql, missing }
    }

    pub fn init_plan_names(&self) -> impl Iterator<Item = &str> {
        self.init_plans.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.init_plans.len() + self.sub_plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `WITH `a` AS (...), `b` AS (...)\n`, or nothing without InitPlans.
    pub fn with_preamble(&self) -> String {
        let entries = self
            .init_plans
            .iter()
            .filter_map(|(name, fragment)| {
                fragment
                    .as_deref()
                    .map(|f| format!("`{}` AS {}", name, f))
            })
            .collect::<Vec<_>>();
        if entries.is_empty() {
            return String::new();
        }
        format!("WITH {}\n", entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subplans_inline_and_initplans_reference() {
        let mut reg = SubplanRegistry::new();
        reg.insert(SubplanKind::SubPlan, "SubPlan 1", "(\n  FROM `t`\n)".into());
        reg.insert(SubplanKind::InitPlan, "InitPlan 2", "(\n  FROM `u`\n)".into());

        let out = reg.resolve("(a = ANY (`(SubPlan 1)`)) AND (b > `(InitPlan 2)`)");
        assert_eq!(
            out.sql,
            "(a = ANY ((\n  FROM `t`\n))) AND (b > (FROM `InitPlan 2`))"
        );
        assert!(out.missing.is_empty());
    }

    #[test]
    fn missing_refs_are_reported() {
        let reg = SubplanRegistry::new();
        let out = reg.resolve("x = `(SubPlan 9)`");
        assert_eq!(out.sql, "x = `(SubPlan 9)`");
        assert_eq!(out.missing, vec!["SubPlan 9"]);
    }

    #[test]
    fn reserved_initplans_resolve_and_keep_order() {
        let mut reg = SubplanRegistry::new();
        reg.reserve(SubplanKind::InitPlan, "InitPlan 1");
        reg.reserve(SubplanKind::InitPlan, "InitPlan 3");
        assert_eq!(reg.resolve("`(InitPlan 3)`").sql, "(FROM `InitPlan 3`)");

        reg.insert(SubplanKind::InitPlan, "InitPlan 3", "(b)".into());
        reg.insert(SubplanKind::InitPlan, "InitPlan 1", "(a)".into());
        assert_eq!(
            reg.with_preamble(),
            "WITH `InitPlan 1` AS (a), `InitPlan 3` AS (b)\n"
        );
        assert_eq!(
            reg.init_plan_names().collect::<Vec<_>>(),
            vec!["InitPlan 1", "InitPlan 3"]
        );
    }

    #[test]
    fn no_initplans_no_preamble() {
        let mut reg = SubplanRegistry::new();
        assert_eq!(reg.with_preamble(), "");
        reg.insert(SubplanKind::SubPlan, "SubPlan 1", "(x)".into());
        assert_eq!(reg.with_preamble(), "");
        assert_eq!(reg.fragment(SubplanKind::SubPlan, "SubPlan 1"), Some("(x)"));
    }
}
