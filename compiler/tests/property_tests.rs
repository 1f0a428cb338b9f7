// Property-based tests for generator invariants.
//
// Three categories:
// 1. Inheritance reduction over random acyclic prerequisite graphs
// 2. Namespace scope transitions over random chain sequences
// 3. C string quoting round trips
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use cxxstub::id::{NamespaceId, TypeId};
use cxxstub::inherit::{has_ancestor, reduce};
use cxxstub::model::{TypeKind, TypeModel, TypeNode};
use cxxstub::quote::{cquote, cunquote};
use cxxstub::scope::NamespaceScope;
use proptest::prelude::*;

// ── Model generators ────────────────────────────────────────────────────────

/// Prerequisite lists for `n` interfaces; interface `i` may only derive from
/// interfaces declared before it, so the graph is acyclic.
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..8).prop_flat_map(|n| {
        let lists: Vec<_> = (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..4).boxed()
                }
            })
            .collect();
        lists
    })
}

fn build_model(dag: &[Vec<usize>]) -> (TypeModel, Vec<TypeId>) {
    let mut model = TypeModel::new();
    let mut ids: Vec<TypeId> = Vec::new();
    for (i, prereqs) in dag.iter().enumerate() {
        let node = TypeNode::new(
            format!("I{}", i),
            vec![],
            TypeKind::Interface {
                fields: vec![],
                methods: vec![],
            },
        )
        .with_prerequisites(prereqs.iter().map(|&p| ids[p]).collect());
        ids.push(model.add_type(node));
    }
    (model, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn reduction_keeps_only_direct_bases(dag in arb_dag()) {
        let (model, ids) = build_model(&dag);
        for &id in &ids {
            let prereqs = model.get(id).prerequisites.clone();
            let reduced = reduce(&model, &prereqs);
            // No survivor is reachable from another survivor.
            for (i, &a) in reduced.iter().enumerate() {
                for (j, &b) in reduced.iter().enumerate() {
                    if i != j {
                        prop_assert!(a != b);
                        prop_assert!(!has_ancestor(&model, a, b));
                    }
                }
            }
            // Every dropped prerequisite is still covered.
            for &p in &prereqs {
                prop_assert!(reduced.iter().any(|&r| r == p || has_ancestor(&model, r, p)));
            }
            // Survivors keep their relative declaration order.
            let positions: Vec<usize> = reduced
                .iter()
                .map(|r| prereqs.iter().position(|p| p == r).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn reduction_is_a_fixed_point(dag in arb_dag()) {
        let (model, ids) = build_model(&dag);
        for &id in &ids {
            let once = reduce(&model, &model.get(id).prerequisites);
            let twice = reduce(&model, &once);
            prop_assert_eq!(once, twice);
        }
    }
}

// ── Namespace scope ─────────────────────────────────────────────────────────

const PATHS: [&[&str]; 6] = [
    &[],
    &["ns1"],
    &["ns1", "ns2"],
    &["ns1", "ns3"],
    &["other"],
    &["ns1", "ns2", "deep"],
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn scope_transitions_balance(seq in proptest::collection::vec(0..PATHS.len(), 0..20)) {
        let mut model = TypeModel::new();
        let chains: Vec<Vec<NamespaceId>> =
            PATHS.iter().map(|p| model.intern_namespace(p)).collect();
        let mut scope = NamespaceScope::new();
        let mut text = String::new();
        for &i in &seq {
            text.push_str(&scope.enter(&model, &chains[i]));
            prop_assert_eq!(scope.current(), chains[i].as_slice());
        }
        text.push_str(&scope.enter(&model, &[]));
        prop_assert!(scope.is_empty());
        let opens = text.matches("namespace ").count();
        let closes = text.matches("} // ").count();
        prop_assert_eq!(opens, closes);
    }

    #[test]
    fn reentering_current_scope_is_silent(i in 0..PATHS.len()) {
        let mut model = TypeModel::new();
        let chain = model.intern_namespace(PATHS[i]);
        let mut scope = NamespaceScope::new();
        scope.enter(&model, &chain);
        prop_assert_eq!(scope.enter(&model, &chain), "");
    }
}

// ── Quoting ─────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn quote_unquote_roundtrip(s in ".*") {
        prop_assert_eq!(cunquote(&cquote(&s)), Some(s));
    }
}
