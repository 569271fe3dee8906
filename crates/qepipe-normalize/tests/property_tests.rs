//! Property-based tests for the normalizer's rewrites and corrections.

use proptest::prelude::*;
use qepipe_core::expr::quote_subplan_refs;
use qepipe_core::qep::QepNode;
use qepipe_normalize::corrections::{
    correct_order_markers, correct_sql_arrays, strip_column_positions,
};
use qepipe_normalize::rewrites::{AliasPushUp, FilterCanonicalization};
use qepipe_normalize::{apply, StaticCatalog};

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

/// Expression fragments mixing columns, subplan references and literals.
fn arb_expr() -> impl Strategy<Value = String> {
    let atom = prop_oneof![
        arb_ident().prop_map(|c| format!("t.{}", c)),
        (1u32..20).prop_map(|n| format!("(SubPlan {})", n)),
        (1u32..20).prop_map(|n| format!("(hashed SubPlan {}).col1", n)),
        (1u32..20).prop_map(|n| format!("(InitPlan {})", n)),
        (0i64..1000).prop_map(|n| n.to_string()),
    ];
    prop::collection::vec(atom, 1..5).prop_map(|atoms| atoms.join(" = "))
}

fn arb_predicate() -> impl Strategy<Value = Option<String>> {
    prop::option::of(arb_expr())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_quoting_is_idempotent(expr in arb_expr()) {
        let once = quote_subplan_refs(&strip_column_positions(&expr));
        prop_assert_eq!(quote_subplan_refs(&once), once.clone());
        prop_assert!(!once.contains("hashed"));
    }

    #[test]
    fn prop_corrections_are_idempotent(expr in arb_expr()) {
        let once = correct_order_markers(&correct_sql_arrays(&expr));
        let twice = correct_order_markers(&correct_sql_arrays(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_array_correction_keeps_every_element(
        items in prop::collection::vec(0u32..1000, 1..8),
    ) {
        let literal = items.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        let out = correct_sql_arrays(&format!("CAST('{{{}}}' AS ARRAY<INT64>)", literal));
        prop_assert_eq!(out.matches("CAST(").count(), items.len());
        prop_assert!(out.starts_with('[') && out.ends_with(']'));
    }

    #[test]
    fn prop_filters_collect_every_predicate(
        index_cond in arb_predicate(),
        recheck_cond in arb_predicate(),
        join_filter in arb_predicate(),
        filter in arb_predicate(),
        one_time_filter in arb_predicate(),
    ) {
        let mut node = QepNode::new("Nested Loop");
        node.index_cond = index_cond.clone();
        node.recheck_cond = recheck_cond.clone();
        node.join_filter = join_filter.clone();
        node.filter = filter.clone();
        node.one_time_filter = one_time_filter.clone();

        let expected = [index_cond, recheck_cond, join_filter, filter, one_time_filter]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let out = apply(node, &FilterCanonicalization).unwrap();
        prop_assert_eq!(out.filters, expected);
    }

    #[test]
    fn prop_alias_push_up_never_overwrites(
        own in prop::option::of(arb_ident()),
        child in prop::option::of(arb_ident()),
    ) {
        let mut leaf = QepNode::new("Seq Scan");
        leaf.alias = child.clone();
        let mut root = QepNode::new("Sort");
        root.alias = own.clone();
        root.plans.push(leaf);

        let out = apply(root, &AliasPushUp).unwrap();
        let expected = own.or(child);
        prop_assert_eq!(out.alias, expected);
    }

    #[test]
    fn prop_catalog_builder_serves_what_it_was_given(
        schema in arb_ident(),
        index in arb_ident(),
        columns in prop::collection::vec(arb_ident(), 1..4),
    ) {
        use qepipe_normalize::Catalog;
        let catalog = StaticCatalog::new().with_index(&schema, &index, columns.clone());
        prop_assert_eq!(catalog.get_index_key(&index, &schema).unwrap(), columns);
    }
}
