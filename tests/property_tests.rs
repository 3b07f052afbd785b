//! Property-based tests for the validators

mod fixtures;

use std::collections::HashSet;

use proptest::prelude::*;

use yang_validation::validators::{
    check_content, validate_tree, CanonicalComparator, ContentOutcome, DeferReason, DeferredQueue,
    ErrorKind, FeatureSet, IfFeatureExpr, LeafType, ValidationContext, ValueComparator,
};
use yang_validation::NodeId;

fn arb_reason() -> impl Strategy<Value = DeferReason> {
    let (_, ids) = fixtures::schema();
    prop_oneof![Just(DeferReason::When), Just(DeferReason::CaseWhen(ids.top))]
}

fn arb_feature_expr() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string);
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| format!("not {}", e)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({} and {})", l, r)),
            (inner.clone(), inner).prop_map(|(l, r)| format!("({} or {})", l, r)),
        ]
    })
}

proptest! {
    #[test]
    fn queue_holds_each_node_once(pushes in prop::collection::vec((0usize..16, arb_reason()), 0..64)) {
        let mut queue = DeferredQueue::new();
        let mut first_reason = std::collections::HashMap::new();
        for (index, reason) in &pushes {
            let node = NodeId::from_raw(*index);
            let added = queue.push(node, *reason);
            prop_assert_eq!(added, !first_reason.contains_key(&node));
            first_reason.entry(node).or_insert(*reason);
        }

        prop_assert_eq!(queue.len(), first_reason.len());
        for item in queue.iter() {
            prop_assert_eq!(Some(&item.reason), first_reason.get(&item.node));
        }
    }

    #[test]
    fn leaf_list_keeps_first_of_each_value(values in prop::collection::vec(-20i32..20, 0..24)) {
        let (mut tree, top) = fixtures::tree();
        for value in &values {
            tree.add_value(Some(top), "value", &value.to_string()).unwrap();
        }

        let mut ctx = ValidationContext::default();
        let report = validate_tree(&mut tree, &mut ctx).unwrap();

        let mut seen = HashSet::new();
        let expected: Vec<String> = values
            .iter()
            .filter(|v| seen.insert(**v))
            .map(|v| v.to_string())
            .collect();
        let remaining: Vec<String> = tree
            .children(Some(top))
            .iter()
            .filter_map(|n| tree.value(*n).map(str::to_string))
            .collect();
        prop_assert_eq!(&remaining, &expected);
        prop_assert_eq!(report.diagnostics.len(), values.len() - expected.len());
        prop_assert!(report.diagnostics.iter().all(|e| e.kind == ErrorKind::DuplicateInstance));
    }

    #[test]
    fn validated_tree_is_stable(values in prop::collection::vec(0u16..8, 1..12), udp in any::<bool>()) {
        let (mut tree, top) = fixtures::tree();
        for value in &values {
            let server = tree.add(Some(top), "server").unwrap();
            tree.add_value(Some(server), "name", &format!("s{}", value)).unwrap();
        }
        tree.add_value(Some(top), "tcp-port", "80").unwrap();
        if udp {
            tree.add_value(Some(top), "udp-port", "53").unwrap();
        }

        let mut ctx = ValidationContext::default();
        validate_tree(&mut tree, &mut ctx).unwrap();
        let len = tree.len();

        for node in tree.children(Some(top)).to_vec() {
            prop_assert_eq!(check_content(&mut tree, node, &ctx).unwrap(), ContentOutcome::Success);
            prop_assert_eq!(check_content(&mut tree, node, &ctx).unwrap(), ContentOutcome::Success);
        }
        prop_assert_eq!(tree.len(), len);

        let again = validate_tree(&mut tree, &mut ctx).unwrap();
        prop_assert!(again.is_valid());
        prop_assert_eq!(again.removed, 0);
    }

    #[test]
    fn zero_padded_integers_compare_equal(n in any::<i32>(), width in 1usize..16) {
        let cmp = CanonicalComparator::new();
        let sign = if n < 0 { "-" } else { "" };
        let padded = format!("{}{:0>width$}", sign, n.unsigned_abs(), width = width);
        prop_assert!(cmp.equal(&n.to_string(), &padded, &LeafType::Int32));
        prop_assert!(!cmp.equal(&n.to_string(), &(i64::from(n) + 1).to_string(), &LeafType::Int64));
    }

    #[test]
    fn feature_expr_display_reparses(text in arb_feature_expr()) {
        let expr = IfFeatureExpr::parse(&text).unwrap();
        let again = IfFeatureExpr::parse(&expr.to_string()).unwrap();
        prop_assert_eq!(&again, &expr);

        let features = FeatureSet::with_features(["a", "c"]);
        prop_assert_eq!(again.evaluate(&features), expr.evaluate(&features));
    }

    #[test]
    fn negation_flips_evaluation(text in arb_feature_expr(), enabled in prop::collection::vec(any::<bool>(), 4)) {
        let names = ["a", "b", "c", "d"];
        let features = FeatureSet::with_features(
            names.iter().zip(&enabled).filter(|(_, on)| **on).map(|(n, _)| *n),
        );
        let expr = IfFeatureExpr::parse(&text).unwrap();
        let negated = IfFeatureExpr::parse(&format!("not ({})", text)).unwrap();
        prop_assert_eq!(negated.evaluate(&features), !expr.evaluate(&features));
    }
}
