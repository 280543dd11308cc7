//! The delta algebra: a tree of tagged edits plus a similarity score.

use std::collections::BTreeMap;

use json_delta_textpatch::Patch;
use serde_json::Value;

use crate::lcs;
use crate::value::Kind;

/// An atomic difference between two JSON values.
///
/// Deltas are immutable once built; the comparator produces them, the
/// applier, the wire codec, and the formatter consume them.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Per-key edits on an object. Keys are disjoint operations on
    /// distinct object keys; the map is never empty.
    Object(BTreeMap<String, Delta>),
    /// Edits on an array. `pre` is keyed by source index and holds only
    /// `Deleted` and `Moved`; `post` is keyed by destination index and
    /// holds `Added`, `Modified`, `TextDiff`, and nested containers.
    Array {
        pre: BTreeMap<usize, Delta>,
        post: BTreeMap<usize, Delta>,
    },
    /// A new value at this position.
    Added(Value),
    /// An existing value removed.
    Deleted(Value),
    /// A wholesale replacement.
    Modified { old: Value, new: Value },
    /// A string replacement expressed as a text patch.
    ///
    /// `old`/`new` are present on comparator-built deltas; a delta
    /// reconstructed from the wire carries only the patch.
    TextDiff {
        patch: Vec<Patch>,
        old: Option<String>,
        new: Option<String>,
    },
    /// An array element moved to `new_index`. `nested` is carried for
    /// wire-format compatibility only; the serializer refuses it.
    Moved {
        new_index: usize,
        value: Value,
        nested: Option<Box<Delta>>,
    },
}

impl Delta {
    /// How close the two sides of this delta are, in [0, 1].
    ///
    /// A pure function of the subtree; used by the array aligner to choose
    /// between pairing two items as a modification and treating them as an
    /// unrelated delete plus add.
    pub fn similarity(&self) -> f64 {
        match self {
            Delta::Added(_) | Delta::Deleted(_) => 0.0,
            Delta::Moved { .. } => 0.6,
            Delta::Modified { old, new } => modified_similarity(old, new),
            Delta::TextDiff { old, new, .. } => match (old, new) {
                (Some(old), Some(new)) => {
                    0.6 + 0.4 * string_similarity(old, new)
                }
                // Wire-decoded: both sides are strings, nothing else known.
                _ => 0.6,
            },
            Delta::Object(children) => mean(children.values()),
            Delta::Array { pre, post } => mean(pre.values().chain(post.values())),
        }
    }
}

/// Arithmetic mean of child similarities; an empty set of children means
/// "no change" and scores 1 (the comparator never emits such a node).
fn mean<'a>(children: impl Iterator<Item = &'a Delta>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for child in children {
        sum += child.similarity();
        count += 1;
    }
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}

fn modified_similarity(old: &Value, new: &Value) -> f64 {
    let mut similarity = 0.3; // at least, they are at the same position
    if Kind::of(old) == Kind::of(new) {
        similarity += 0.3; // kinds are the same
        match (old, new) {
            (Value::String(old), Value::String(new)) => {
                similarity += 0.4 * string_similarity(old, new);
            }
            (Value::Number(old), Value::Number(new)) => {
                let old = old.as_f64().unwrap_or(0.0);
                let new = new.as_f64().unwrap_or(0.0);
                // min(old/new, new/old); no bonus for zero or opposite
                // signs, which would push the score out of [0, 1].
                if new != 0.0 && old != 0.0 {
                    let ratio = (old / new).min(new / old);
                    if ratio > 0.0 {
                        similarity += 0.4 * ratio;
                    }
                }
            }
            _ => {}
        }
    }
    similarity
}

/// `(|LCS| / |old|) * (|LCS| / |new|)` over code points.
fn string_similarity(old: &str, new: &str) -> f64 {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    if old_chars.is_empty() || new_chars.is_empty() {
        return 0.0;
    }
    let matching = lcs::length(&old_chars, &new_chars, |a, b| a == b) as f64;
    (matching / old_chars.len() as f64) * (matching / new_chars.len() as f64)
}
