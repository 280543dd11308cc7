//! Applying a delta tree to a value.
//!
//! The left value is consumed; on error it may already be partially
//! mutated, so callers needing atomicity should work on a clone.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::delta::Delta;
use crate::value::Kind;

#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("delta variant not allowed {0}")]
    UnknownVariant(&'static str),
    #[error("array index {0} out of bounds")]
    InvalidIndex(usize),
    #[error("text patch failed to apply")]
    TextPatchFailed,
}

/// Transform `value` according to `delta`, yielding the right-hand value.
pub fn apply_delta(value: Value, delta: &Delta) -> Result<Value, PatchError> {
    match delta {
        Delta::Object(children) => match value {
            Value::Object(map) => Ok(Value::Object(apply_object(map, children)?)),
            other => Err(mismatch("object", &other)),
        },
        Delta::Array { pre, post } => match value {
            Value::Array(items) => Ok(Value::Array(apply_array(items, pre, post)?)),
            other => Err(mismatch("array", &other)),
        },
        Delta::Added(new) => Ok(new.clone()),
        Delta::Modified { new, .. } => Ok(new.clone()),
        Delta::TextDiff { patch, new, .. } => apply_text_diff(patch, new.as_deref(), &value),
        Delta::Deleted(_) => Ok(Value::Null),
        Delta::Moved { .. } => Err(PatchError::UnknownVariant("outside an array")),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> PatchError {
    PatchError::TypeMismatch {
        expected,
        found: Kind::of(found).as_str(),
    }
}

fn apply_object(
    mut map: Map<String, Value>,
    children: &BTreeMap<String, Delta>,
) -> Result<Map<String, Value>, PatchError> {
    for (key, child) in children {
        match child {
            Delta::Object(_) | Delta::Array { .. } => match map.get_mut(key) {
                Some(slot) => {
                    let current = std::mem::take(slot);
                    *slot = apply_delta(current, child)?;
                }
                None => {
                    return Err(PatchError::TypeMismatch {
                        expected: "object or array",
                        found: "absent",
                    })
                }
            },
            Delta::Added(new) | Delta::Modified { new, .. } => {
                map.insert(key.clone(), new.clone());
            }
            Delta::TextDiff { patch, new, .. } => {
                let patched = match map.get(key) {
                    Some(current) => apply_text_diff(patch, new.as_deref(), current)?,
                    None => apply_text_diff(patch, new.as_deref(), &Value::Null)?,
                };
                map.insert(key.clone(), patched);
            }
            Delta::Deleted(_) => {
                map.remove(key);
            }
            Delta::Moved { .. } => {
                return Err(PatchError::UnknownVariant("inside an object"));
            }
        }
    }
    Ok(map)
}

/// What lands at one destination index of the rebuilt array.
enum PostOp<'a> {
    /// A moved element, captured from the document at delete time.
    Insert(Value),
    Child(&'a Delta),
}

fn apply_array(
    mut items: Vec<Value>,
    pre: &BTreeMap<usize, Delta>,
    post: &BTreeMap<usize, Delta>,
) -> Result<Vec<Value>, PatchError> {
    let mut ops: BTreeMap<usize, PostOp> = post
        .iter()
        .map(|(index, child)| (*index, PostOp::Child(child)))
        .collect();

    // Source-side pass, descending so earlier indices stay valid. Each
    // move becomes a deletion here plus an insertion of the captured
    // element at its destination.
    for (&index, child) in pre.iter().rev() {
        match child {
            Delta::Deleted(_) => {
                if index >= items.len() {
                    return Err(PatchError::InvalidIndex(index));
                }
                items.remove(index);
            }
            Delta::Moved { new_index, .. } => {
                if index >= items.len() {
                    return Err(PatchError::InvalidIndex(index));
                }
                let element = items.remove(index);
                if ops.insert(*new_index, PostOp::Insert(element)).is_some() {
                    return Err(PatchError::InvalidIndex(*new_index));
                }
            }
            _ => return Err(PatchError::UnknownVariant("at a source index")),
        }
    }

    // Destination-side pass, ascending so each index refers to the
    // post-state of the array.
    for (index, op) in ops {
        match op {
            PostOp::Insert(element) => {
                if index > items.len() {
                    return Err(PatchError::InvalidIndex(index));
                }
                items.insert(index, element);
            }
            PostOp::Child(child) => match child {
                Delta::Added(new) => {
                    if index > items.len() {
                        return Err(PatchError::InvalidIndex(index));
                    }
                    items.insert(index, new.clone());
                }
                Delta::Modified { new, .. } => {
                    let slot = items
                        .get_mut(index)
                        .ok_or(PatchError::InvalidIndex(index))?;
                    *slot = new.clone();
                }
                Delta::TextDiff { patch, new, .. } => {
                    let slot = items
                        .get_mut(index)
                        .ok_or(PatchError::InvalidIndex(index))?;
                    let current = std::mem::take(slot);
                    *slot = apply_text_diff(patch, new.as_deref(), &current)?;
                }
                Delta::Object(_) | Delta::Array { .. } => {
                    let slot = items
                        .get_mut(index)
                        .ok_or(PatchError::InvalidIndex(index))?;
                    let current = std::mem::take(slot);
                    *slot = apply_delta(current, child)?;
                }
                _ => return Err(PatchError::UnknownVariant("at a destination index")),
            },
        }
    }

    Ok(items)
}

/// Resolve a text diff to its new string.
///
/// Comparator-built deltas already carry the result. A wire-decoded delta
/// carries only the patch, which is executed against the current string;
/// any hunk that does not apply aborts the subtree.
pub(crate) fn apply_text_diff(
    patch: &[json_delta_textpatch::Patch],
    new: Option<&str>,
    current: &Value,
) -> Result<Value, PatchError> {
    if let Some(new) = new {
        return Ok(Value::String(new.to_string()));
    }
    match current {
        Value::String(old) => {
            let (patched, hunks_ok) = json_delta_textpatch::apply_patch(patch, old);
            if hunks_ok.iter().all(|ok| *ok) {
                Ok(Value::String(patched))
            } else {
                Err(PatchError::TextPatchFailed)
            }
        }
        other => Err(mismatch("string", other)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
