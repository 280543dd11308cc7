//! Property tests over generated JSON documents.

use json_delta::{apply_delta, codec, Delta, DiffOptions, Differ};
use proptest::prelude::*;
use serde_json::Value;

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000i64).prop_map(Value::from),
        (-100.0f64..100.0f64).prop_map(|f| serde_json::json!(f)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    // Small key and value spaces on purpose, so that collisions, moves,
    // and near-misses actually occur.
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]{1,3}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Similarity bounds and array-delta well-formedness, over the whole tree.
fn assert_well_formed(delta: &Delta) {
    let s = delta.similarity();
    assert!((0.0..=1.0).contains(&s), "similarity {s} out of [0, 1]");
    match delta {
        Delta::Object(children) => children.values().for_each(assert_well_formed),
        Delta::Array { pre, post } => {
            for child in pre.values() {
                assert!(
                    matches!(child, Delta::Deleted(_) | Delta::Moved { .. }),
                    "bad variant at a source index: {child:?}"
                );
                assert_well_formed(child);
            }
            for child in post.values() {
                assert!(
                    !matches!(child, Delta::Deleted(_) | Delta::Moved { .. }),
                    "bad variant at a destination index: {child:?}"
                );
                assert_well_formed(child);
            }
        }
        Delta::Moved { nested, .. } => {
            assert!(nested.is_none(), "comparator never nests under a move");
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn compare_then_apply_recovers_right(left in arb_json(), right in arb_json()) {
        match Differ::new().compare(&left, &right) {
            None => prop_assert_eq!(left, right),
            Some(delta) => {
                let patched = apply_delta(left, &delta).expect("apply failed");
                prop_assert_eq!(patched, right);
            }
        }
    }

    #[test]
    fn compare_is_reflexive(doc in arb_json()) {
        prop_assert_eq!(Differ::new().compare(&doc, &doc), None);
    }

    #[test]
    fn compare_is_deterministic(left in arb_json(), right in arb_json()) {
        let differ = Differ::new();
        let first = differ.compare(&left, &right);
        let second = differ.compare(&left, &right);
        prop_assert_eq!(&first, &second);
        if let Some(delta) = first {
            let wire_a = serde_json::to_string(&codec::to_value(&delta).unwrap()).unwrap();
            let wire_b = serde_json::to_string(&codec::to_value(&delta).unwrap()).unwrap();
            prop_assert_eq!(wire_a, wire_b);
        }
    }

    #[test]
    fn deltas_are_well_formed(left in arb_json(), right in arb_json()) {
        if let Some(delta) = Differ::new().compare(&left, &right) {
            assert_well_formed(&delta);
        }
    }

    #[test]
    fn wire_roundtrip_is_stable_and_applies(left in arb_json(), right in arb_json()) {
        if let Some(delta) = Differ::new().compare(&left, &right) {
            let wire = codec::to_value(&delta).expect("serialize failed");
            let back = codec::from_value(&wire).expect("deserialize failed");
            prop_assert_eq!(codec::to_value(&back).expect("re-serialize failed"), wire);
            let patched = apply_delta(left, &back).expect("apply of decoded delta failed");
            prop_assert_eq!(patched, right);
        }
    }

    #[test]
    fn text_diffs_roundtrip_through_the_wire(
        old in "[ a-z]{0,40}",
        new in "[ a-z]{0,40}",
    ) {
        let differ = Differ::with_options(DiffOptions { text_diff_minimum_length: 1 });
        let left = Value::String(old.clone());
        let right = Value::String(new.clone());
        if let Some(delta) = differ.compare(&left, &right) {
            let wire = codec::to_value(&delta).expect("serialize failed");
            let back = codec::from_value(&wire).expect("deserialize failed");
            // Decoded text diffs carry only the patch; applying must
            // rebuild the new string from the document.
            let patched = apply_delta(left, &back).expect("apply failed");
            prop_assert_eq!(patched, right);
        }
    }
}
