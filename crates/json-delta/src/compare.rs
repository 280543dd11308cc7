//! The recursive value comparator and the array aligner.
//!
//! Comparison walks two JSON values and emits a [`Delta`] tree. Objects
//! recurse per key; arrays are aligned by anchoring equal elements with an
//! LCS, extracting moves among the leftovers, and then pairing up the
//! remaining candidates inside each LCS gap with a similarity-maximizing
//! assignment, so that "changed in place" wins over "delete plus add"
//! when the items resemble each other.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::delta::Delta;
use crate::lcs;
use crate::value::Kind;

// ── Configuration ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Old-string length (in chars) at or above which a changed string is
    /// emitted as a text patch instead of a wholesale replacement. Set to
    /// `usize::MAX` to disable text diffing.
    pub text_diff_minimum_length: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            text_diff_minimum_length: 30,
        }
    }
}

// ── Differ ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Differ {
    options: DiffOptions,
}

/// A non-anchor array element awaiting classification.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    /// Position in the original array.
    index: usize,
    /// Index of the next LCS pair after this element (the gap it sits in).
    gap: usize,
    item: &'a Value,
}

impl Differ {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compare two values. `None` means they are structurally equal.
    pub fn compare(&self, left: &Value, right: &Value) -> Option<Delta> {
        self.compare_values(left, right)
    }

    /// Compare two JSON documents given as bytes.
    pub fn compare_bytes(
        &self,
        left: &[u8],
        right: &[u8],
    ) -> Result<Option<Delta>, serde_json::Error> {
        let left: Value = serde_json::from_slice(left)?;
        let right: Value = serde_json::from_slice(right)?;
        Ok(self.compare_values(&left, &right))
    }

    // ── Recursive comparison ──────────────────────────────────────────────

    fn compare_values(&self, left: &Value, right: &Value) -> Option<Delta> {
        if Kind::of(left) != Kind::of(right) {
            return Some(Delta::Modified {
                old: left.clone(),
                new: right.clone(),
            });
        }

        match (left, right) {
            (Value::Object(left), Value::Object(right)) => {
                let children = self.compare_maps(left, right);
                if children.is_empty() {
                    None
                } else {
                    Some(Delta::Object(children))
                }
            }
            (Value::Array(left), Value::Array(right)) => {
                let (pre, post) = self.compare_arrays(left, right);
                if pre.is_empty() && post.is_empty() {
                    None
                } else {
                    Some(Delta::Array { pre, post })
                }
            }
            _ => {
                if left == right {
                    return None;
                }
                if let (Value::String(old), Value::String(new)) = (left, right) {
                    if old.chars().count() >= self.options.text_diff_minimum_length {
                        return Some(Delta::TextDiff {
                            patch: json_delta_textpatch::make_patch(old, new),
                            old: Some(old.clone()),
                            new: Some(new.clone()),
                        });
                    }
                }
                Some(Delta::Modified {
                    old: left.clone(),
                    new: right.clone(),
                })
            }
        }
    }

    fn compare_maps(
        &self,
        left: &Map<String, Value>,
        right: &Map<String, Value>,
    ) -> BTreeMap<String, Delta> {
        // BTreeMap keeps delta order sorted regardless of input key order.
        let mut children = BTreeMap::new();
        for (key, left_value) in left {
            match right.get(key) {
                Some(right_value) => {
                    if let Some(delta) = self.compare_values(left_value, right_value) {
                        children.insert(key.clone(), delta);
                    }
                }
                None => {
                    children.insert(key.clone(), Delta::Deleted(left_value.clone()));
                }
            }
        }
        for (key, right_value) in right {
            if !left.contains_key(key) {
                children.insert(key.clone(), Delta::Added(right_value.clone()));
            }
        }
        children
    }

    // ── Array alignment ───────────────────────────────────────────────────

    fn compare_arrays(
        &self,
        left: &[Value],
        right: &[Value],
    ) -> (BTreeMap<usize, Delta>, BTreeMap<usize, Delta>) {
        let mut pre = BTreeMap::new(); // deletions and moves, by source index
        let mut post = BTreeMap::new(); // additions and changes, by destination index

        let pairs = lcs::index_pairs(left, right, |a, b| a == b);

        // Left elements off the LCS: candidates for delete, move, modify.
        let mut maybe_deleted: Vec<Candidate> = Vec::new();
        let mut k = 0;
        for (i, item) in left.iter().enumerate() {
            if k < pairs.len() && pairs[k].left == i {
                k += 1;
            } else {
                maybe_deleted.push(Candidate { index: i, gap: k, item });
            }
        }

        // Right elements off the LCS: candidates for add, move, modify.
        let mut maybe_added: Vec<Candidate> = Vec::new();
        let mut k = 0;
        for (i, item) in right.iter().enumerate() {
            if k < pairs.len() && pairs[k].right == i {
                k += 1;
            } else {
                maybe_added.push(Candidate { index: i, gap: k, item });
            }
        }

        // Moves: a deletion candidate deep-equal to an addition candidate
        // is the same element at a new index. First match wins; moves may
        // cross gap boundaries.
        let mut d = 0;
        while d < maybe_deleted.len() {
            let del = maybe_deleted[d];
            match maybe_added.iter().position(|add| add.item == del.item) {
                Some(a) => {
                    let add = maybe_added.remove(a);
                    maybe_deleted.remove(d);
                    pre.insert(
                        del.index,
                        Delta::Moved {
                            new_index: add.index,
                            value: del.item.clone(),
                            nested: None,
                        },
                    );
                }
                None => d += 1,
            }
        }

        // Within each gap, decide modification vs delete-plus-add by
        // maximizing total similarity over the candidate pairing.
        let mut del_cursor = 0;
        let mut add_cursor = 0;
        for gap in 0..=pairs.len() {
            let del_start = del_cursor;
            while del_cursor < maybe_deleted.len() && maybe_deleted[del_cursor].gap == gap {
                del_cursor += 1;
            }
            let add_start = add_cursor;
            while add_cursor < maybe_added.len() && maybe_added[add_cursor].gap == gap {
                add_cursor += 1;
            }
            let dels = &maybe_deleted[del_start..del_cursor];
            let adds = &maybe_added[add_start..add_cursor];

            if !dels.is_empty() && !adds.is_empty() {
                let (paired, free_dels, free_adds) = self.maximize_similarities(dels, adds);
                post.extend(paired);
                for del in free_dels {
                    pre.insert(del.index, Delta::Deleted(del.item.clone()));
                }
                for add in free_adds {
                    post.insert(add.index, Delta::Added(add.item.clone()));
                }
            } else {
                for del in dels {
                    pre.insert(del.index, Delta::Deleted(del.item.clone()));
                }
                for add in adds {
                    post.insert(add.index, Delta::Added(add.item.clone()));
                }
            }
        }

        (pre, post)
    }

    /// Pair up candidates of one gap so that the sum of child similarities
    /// is maximal, preserving original order. Exactly `min(|L|, |R|)`
    /// pairs are produced; the leftovers of the longer side come back as
    /// free items.
    fn maximize_similarities<'a>(
        &self,
        dels: &[Candidate<'a>],
        adds: &[Candidate<'a>],
    ) -> (BTreeMap<usize, Delta>, Vec<Candidate<'a>>, Vec<Candidate<'a>>) {
        let n = dels.len();
        let m = adds.len();

        let mut deltas: Vec<Vec<Option<Delta>>> = Vec::with_capacity(n);
        let mut sims = vec![vec![0.0f64; m]; n];
        for (i, del) in dels.iter().enumerate() {
            let mut row = Vec::with_capacity(m);
            for (j, add) in adds.iter().enumerate() {
                match self.compare_values(del.item, add.item) {
                    Some(delta) => {
                        sims[i][j] = delta.similarity();
                        row.push(Some(delta));
                    }
                    // Move extraction leaves no deep-equal cross pair.
                    None => unreachable!("equal items reached similarity alignment"),
                }
            }
            deltas.push(row);
        }

        let mut dp = vec![vec![0.0f64; m + 1]; n + 1];
        for x in (0..n).rev() {
            for y in (0..m).rev() {
                let skip_del = dp[x + 1][y];
                let skip_add = dp[x][y + 1];
                let pair = sims[x][y] + dp[x + 1][y + 1];
                dp[x][y] = skip_del.max(skip_add).max(pair);
            }
        }

        // Trace forward. The validity bounds force exactly min(n, m)
        // pairs; ties prefer skipping a left item, then a right item.
        let max_free = n.min(m) - 1;
        let mut paired = BTreeMap::new();
        let mut free_dels = Vec::with_capacity(n - n.min(m));
        let mut free_adds = Vec::with_capacity(m - n.min(m));
        let (mut x, mut y) = (0usize, 0usize);
        while x < n && y < m {
            let x_valid = n - max_free + y;
            let y_valid = m - max_free + x;
            if x + 1 < x_valid && dp[x][y] == dp[x + 1][y] {
                free_dels.push(dels[x]);
                x += 1;
            } else if y + 1 < y_valid && dp[x][y] == dp[x][y + 1] {
                free_adds.push(adds[y]);
                y += 1;
            } else {
                if let Some(delta) = deltas[x][y].take() {
                    paired.insert(adds[y].index, delta);
                }
                x += 1;
                y += 1;
            }
        }
        free_dels.extend_from_slice(&dels[x..]);
        free_adds.extend_from_slice(&adds[y..]);

        (paired, free_dels, free_adds)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn differ() -> Differ {
        Differ::new()
    }

    #[test]
    fn equal_values_are_same() {
        let d = differ();
        let v = json!({"a": 1, "b": [1, 2, 3], "c": {"d": null}});
        assert_eq!(d.compare(&v, &v), None);
    }

    #[test]
    fn equal_objects_with_different_key_order() {
        let d = differ();
        let left = json!({"a": 1, "b": 2});
        let right = json!({"b": 2, "a": 1});
        assert_eq!(d.compare(&left, &right), None);
    }

    #[test]
    fn kind_change_is_modified() {
        let d = differ();
        let left = json!({"0": "a"});
        let right = json!(["a"]);
        assert_eq!(
            d.compare(&left, &right),
            Some(Delta::Modified {
                old: left.clone(),
                new: right.clone(),
            })
        );
    }

    #[test]
    fn object_add_delete_modify() {
        let d = differ();
        let left = json!({"keep": 1, "drop": 2, "change": "old"});
        let right = json!({"keep": 1, "add": 3, "change": "new"});
        let delta = d.compare(&left, &right).unwrap();
        let Delta::Object(children) = delta else {
            panic!("expected object delta");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(children["drop"], Delta::Deleted(json!(2)));
        assert_eq!(children["add"], Delta::Added(json!(3)));
        assert_eq!(
            children["change"],
            Delta::Modified {
                old: json!("old"),
                new: json!("new"),
            }
        );
    }

    #[test]
    fn array_pure_addition() {
        let d = differ();
        let delta = d.compare(&json!([1, 2]), &json!([1, 2, 3])).unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert!(pre.is_empty());
        assert_eq!(post.len(), 1);
        assert_eq!(post[&2], Delta::Added(json!(3)));
    }

    #[test]
    fn array_pure_deletion() {
        let d = differ();
        let delta = d.compare(&json!([1, 2, 3]), &json!([1, 3])).unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert!(post.is_empty());
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[&1], Delta::Deleted(json!(2)));
    }

    #[test]
    fn array_move_is_detected() {
        let d = differ();
        let delta = d.compare(&json!([1, 2, 3, 4]), &json!([1, 3, 4, 2])).unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert!(post.is_empty());
        assert_eq!(pre.len(), 1);
        assert_eq!(
            pre[&1],
            Delta::Moved {
                new_index: 3,
                value: json!(2),
                nested: None,
            }
        );
    }

    #[test]
    fn gap_modification_beats_add_plus_delete() {
        let d = differ();
        let delta = d
            .compare(
                &json!(["x", {"k": "a"}, "y"]),
                &json!(["x", {"k": "b"}, "y"]),
            )
            .unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert!(pre.is_empty());
        assert_eq!(post.len(), 1);
        let Delta::Object(children) = &post[&1] else {
            panic!("expected nested object delta, got {:?}", post[&1]);
        };
        assert_eq!(
            children["k"],
            Delta::Modified {
                old: json!("a"),
                new: json!("b"),
            }
        );
    }

    #[test]
    fn unrelated_gap_items_become_add_plus_delete() {
        let d = differ();
        // A scalar and an object share nothing; pairing them would score
        // lower than letting both stand alone.
        let delta = d
            .compare(&json!([true, "anchor"]), &json!(["anchor", {"deep": [1, 2]}]))
            .unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert_eq!(pre.len(), 1);
        assert!(matches!(pre[&0], Delta::Deleted(_)));
        assert_eq!(post.len(), 1);
        assert!(matches!(post[&1], Delta::Added(_)));
    }

    #[test]
    fn trailing_unpaired_item_is_deleted_not_lost() {
        let d = differ();
        // Two left leftovers, one right leftover: the DP pairs one and the
        // other must surface as a deletion.
        let left = json!([{"a": 1}, "zzz"]);
        let right = json!([{"a": 2}]);
        let delta = d.compare(&left, &right).unwrap();
        let Delta::Array { pre, post } = delta else {
            panic!("expected array delta");
        };
        assert_eq!(pre.len() + post.len(), 2);
        let total_deleted = pre
            .values()
            .filter(|d| matches!(d, Delta::Deleted(_)))
            .count();
        assert_eq!(total_deleted, 1);
    }

    #[test]
    fn long_string_becomes_text_diff() {
        let d = Differ::with_options(DiffOptions {
            text_diff_minimum_length: 4,
        });
        let delta = d
            .compare(&json!("alpha bravo"), &json!("alpha brave"))
            .unwrap();
        let Delta::TextDiff { patch, old, new } = delta else {
            panic!("expected text diff, got {delta:?}");
        };
        assert!(!patch.is_empty());
        assert_eq!(old.as_deref(), Some("alpha bravo"));
        assert_eq!(new.as_deref(), Some("alpha brave"));
    }

    #[test]
    fn short_string_stays_modified() {
        let d = differ();
        let delta = d.compare(&json!("old"), &json!("new")).unwrap();
        assert!(matches!(delta, Delta::Modified { .. }));
    }

    #[test]
    fn text_diff_disabled_by_large_threshold() {
        let d = Differ::with_options(DiffOptions {
            text_diff_minimum_length: usize::MAX,
        });
        let long = "a".repeat(200);
        let longer = "b".repeat(200);
        let delta = d.compare(&json!(long), &json!(longer)).unwrap();
        assert!(matches!(delta, Delta::Modified { .. }));
    }

    #[test]
    fn compare_bytes_surfaces_decode_errors() {
        let d = differ();
        assert!(d.compare_bytes(b"{not json", b"{}").is_err());
        assert!(d.compare_bytes(b"{}", b"{}").unwrap().is_none());
    }

    #[test]
    fn deterministic_output() {
        let d = differ();
        let left = json!({"arr": [3, 1, {"x": 1}, "s", 4], "o": {"a": 1, "b": 2}});
        let right = json!({"arr": [1, {"x": 2}, "t", 4, 9], "o": {"a": 2, "c": 3}});
        let first = d.compare(&left, &right);
        let second = d.compare(&left, &right);
        assert_eq!(first, second);
    }
}
