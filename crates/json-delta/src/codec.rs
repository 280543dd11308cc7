//! The `jsondiffpatch` wire format.
//!
//! Scalar edits serialize as small arrays discriminated by length and a
//! trailing sentinel number; containers serialize as objects, with array
//! deltas flagged by `"_t": "a"` and source-index keys prefixed `_`.

use std::collections::BTreeMap;

use json_delta_textpatch::{patch_from_text, patch_to_text, TextPatchError};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::delta::Delta;

// Trailing sentinel of the 3-element forms.
pub const DELTA_DELETE: u64 = 0;
pub const DELTA_TEXT_DIFF: u64 = 2;
pub const DELTA_MOVE: u64 = 3;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("moves are not allowed inside objects")]
    MoveInsideObject,
    #[error("refusing to serialize a move carrying a nested delta")]
    MoveCarriesDelta,
    #[error("invalid delta payload: {0}")]
    Invalid(String),
    #[error(transparent)]
    TextPatch(#[from] TextPatchError),
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize a delta tree to its wire form.
pub fn to_value(delta: &Delta) -> Result<Value, CodecError> {
    format_node(delta, false)
}

fn format_node(delta: &Delta, in_object: bool) -> Result<Value, CodecError> {
    match delta {
        Delta::Object(children) => {
            let mut out = Map::new();
            for (key, child) in children {
                out.insert(key.clone(), format_node(child, true)?);
            }
            Ok(Value::Object(out))
        }
        Delta::Array { pre, post } => {
            // Fixed key order: marker, destinations, then sources.
            let mut out = Map::new();
            out.insert("_t".to_string(), json!("a"));
            for (index, child) in post {
                out.insert(index.to_string(), format_node(child, false)?);
            }
            for (index, child) in pre {
                out.insert(format!("_{index}"), format_node(child, false)?);
            }
            Ok(Value::Object(out))
        }
        Delta::Added(value) => Ok(json!([value])),
        Delta::Modified { old, new } => Ok(json!([old, new])),
        Delta::Deleted(value) => Ok(json!([value, 0, DELTA_DELETE])),
        Delta::TextDiff { patch, .. } => Ok(json!([patch_to_text(patch), 0, DELTA_TEXT_DIFF])),
        Delta::Moved {
            new_index, nested, ..
        } => {
            if in_object {
                Err(CodecError::MoveInsideObject)
            } else if nested.is_some() {
                Err(CodecError::MoveCarriesDelta)
            } else {
                Ok(json!(["", new_index, DELTA_MOVE]))
            }
        }
    }
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Where a wire node sits, which constrains the variants allowed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    ObjectChild,
    ArraySource,
    ArrayDestination,
}

/// Reconstruct a delta tree from its wire form.
///
/// `TextDiff` nodes come back with only their patch and `Moved` nodes with
/// the wire placeholder value; neither side of the original values is on
/// the wire.
pub fn from_value(value: &Value) -> Result<Delta, CodecError> {
    parse_node(value, Slot::ObjectChild)
}

fn parse_node(value: &Value, slot: Slot) -> Result<Delta, CodecError> {
    match value {
        Value::Array(items) => parse_edit(items, slot),
        Value::Object(map) => {
            if slot == Slot::ArraySource {
                return Err(CodecError::Invalid(
                    "source indices hold only deletions and moves".to_string(),
                ));
            }
            match map.get("_t") {
                Some(Value::String(t)) if t == "a" => parse_array(map),
                Some(other) => Err(CodecError::Invalid(format!(
                    "unrecognized container marker: {other}"
                ))),
                None => parse_object(map),
            }
        }
        other => Err(CodecError::Invalid(format!(
            "delta node must be an array or object, got {other}"
        ))),
    }
}

fn parse_edit(items: &[Value], slot: Slot) -> Result<Delta, CodecError> {
    match items.len() {
        1 => {
            if slot == Slot::ArraySource {
                return Err(CodecError::Invalid(
                    "addition at a source index".to_string(),
                ));
            }
            Ok(Delta::Added(items[0].clone()))
        }
        2 => {
            if slot == Slot::ArraySource {
                return Err(CodecError::Invalid(
                    "modification at a source index".to_string(),
                ));
            }
            Ok(Delta::Modified {
                old: items[0].clone(),
                new: items[1].clone(),
            })
        }
        3 => {
            let sentinel = items[2].as_u64().ok_or_else(|| {
                CodecError::Invalid(format!("sentinel must be a number, got {}", items[2]))
            })?;
            match sentinel {
                DELTA_DELETE => {
                    if slot == Slot::ArrayDestination {
                        return Err(CodecError::Invalid(
                            "deletion at a destination index".to_string(),
                        ));
                    }
                    Ok(Delta::Deleted(items[0].clone()))
                }
                DELTA_TEXT_DIFF => {
                    if slot == Slot::ArraySource {
                        return Err(CodecError::Invalid(
                            "text diff at a source index".to_string(),
                        ));
                    }
                    let text = items[0].as_str().ok_or_else(|| {
                        CodecError::Invalid("text diff payload must be a string".to_string())
                    })?;
                    Ok(Delta::TextDiff {
                        patch: patch_from_text(text)?,
                        old: None,
                        new: None,
                    })
                }
                DELTA_MOVE => match slot {
                    Slot::ObjectChild => Err(CodecError::MoveInsideObject),
                    Slot::ArrayDestination => Err(CodecError::Invalid(
                        "move at a destination index".to_string(),
                    )),
                    Slot::ArraySource => {
                        let new_index = items[1].as_u64().ok_or_else(|| {
                            CodecError::Invalid(format!(
                                "move index must be a number, got {}",
                                items[1]
                            ))
                        })?;
                        Ok(Delta::Moved {
                            new_index: new_index as usize,
                            value: items[0].clone(),
                            nested: None,
                        })
                    }
                },
                other => Err(CodecError::Invalid(format!("unknown sentinel: {other}"))),
            }
        }
        n => Err(CodecError::Invalid(format!(
            "delta array must have 1 to 3 elements, got {n}"
        ))),
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Delta, CodecError> {
    let mut children = BTreeMap::new();
    for (key, child) in map {
        children.insert(key.clone(), parse_node(child, Slot::ObjectChild)?);
    }
    Ok(Delta::Object(children))
}

fn parse_array(map: &Map<String, Value>) -> Result<Delta, CodecError> {
    let mut pre = BTreeMap::new();
    let mut post = BTreeMap::new();
    for (key, child) in map {
        if key == "_t" {
            continue;
        }
        if let Some(rest) = key.strip_prefix('_') {
            let index: usize = rest.parse().map_err(|_| {
                CodecError::Invalid(format!("bad source index key: {key}"))
            })?;
            pre.insert(index, parse_node(child, Slot::ArraySource)?);
        } else {
            let index: usize = key.parse().map_err(|_| {
                CodecError::Invalid(format!("bad destination index key: {key}"))
            })?;
            post.insert(index, parse_node(child, Slot::ArrayDestination)?);
        }
    }
    Ok(Delta::Array { pre, post })
}

// ── Tests ─────────────────────────────────────────────────────────────────
