//! ASCII rendering of a delta against its left-hand value.
//!
//! Produces an indented JSON-ish listing where every line is prefixed
//! with ` ` (unchanged), `+` (right side only), or `-` (left side only).
//! Modifications render as a `-` line followed by a `+` line. Object keys
//! print in sorted order.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::apply::{apply_text_diff, PatchError};
use crate::delta::Delta;

const SAME: char = ' ';
const ADDED: char = '+';
const DELETED: char = '-';

#[derive(Debug, Clone, Default)]
pub struct AsciiFormatter {
    /// Prefix array entries with their index.
    pub show_array_index: bool,
}

/// What lands at one destination index when rendering an array delta.
enum Slot<'a> {
    MovedIn(usize),
    Child(&'a Delta),
}

impl AsciiFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `delta` against `left`.
    pub fn format(&self, left: &Value, delta: &Delta) -> Result<String, PatchError> {
        let mut out = String::new();
        self.node(&mut out, 0, None, left, delta, false)?;
        Ok(out)
    }

    fn node(
        &self,
        out: &mut String,
        indent: usize,
        label: Option<&str>,
        value: &Value,
        delta: &Delta,
        comma: bool,
    ) -> Result<(), PatchError> {
        match delta {
            Delta::Object(children) => match value {
                Value::Object(map) => self.object(out, indent, label, map, children, comma),
                _ => Err(PatchError::TypeMismatch {
                    expected: "object",
                    found: crate::value::Kind::of(value).as_str(),
                }),
            },
            Delta::Array { pre, post } => match value {
                Value::Array(items) => self.array(out, indent, label, items, pre, post, comma),
                _ => Err(PatchError::TypeMismatch {
                    expected: "array",
                    found: crate::value::Kind::of(value).as_str(),
                }),
            },
            Delta::Added(new) => {
                self.plain(out, ADDED, indent, label, new, comma);
                Ok(())
            }
            Delta::Deleted(old) => {
                self.plain(out, DELETED, indent, label, old, comma);
                Ok(())
            }
            Delta::Modified { old, new } => {
                self.plain(out, DELETED, indent, label, old, comma);
                self.plain(out, ADDED, indent, label, new, comma);
                Ok(())
            }
            Delta::TextDiff { patch, old, new } => {
                let old_value = match old {
                    Some(s) => Value::String(s.clone()),
                    None => value.clone(),
                };
                let new_value = apply_text_diff(patch, new.as_deref(), &old_value)?;
                self.plain(out, DELETED, indent, label, &old_value, comma);
                self.plain(out, ADDED, indent, label, &new_value, comma);
                Ok(())
            }
            Delta::Moved { .. } => Err(PatchError::UnknownVariant("outside an array")),
        }
    }

    fn object(
        &self,
        out: &mut String,
        indent: usize,
        label: Option<&str>,
        map: &Map<String, Value>,
        children: &BTreeMap<String, Delta>,
        comma: bool,
    ) -> Result<(), PatchError> {
        self.open(out, SAME, indent, label, '{');

        let keys: BTreeSet<&str> = map
            .keys()
            .map(String::as_str)
            .chain(children.keys().map(String::as_str))
            .collect();
        let mut remaining = keys.len();
        for key in keys {
            remaining -= 1;
            let entry_comma = remaining > 0;
            let entry_label = format!("{key:?}: ");
            match children.get(key) {
                None => {
                    // No edits under this key.
                    self.plain(out, SAME, indent + 1, Some(&entry_label), &map[key], entry_comma);
                }
                Some(Delta::Added(new)) => {
                    self.plain(out, ADDED, indent + 1, Some(&entry_label), new, entry_comma);
                }
                Some(child @ (Delta::Object(_) | Delta::Array { .. })) => {
                    let value = map.get(key).ok_or(PatchError::TypeMismatch {
                        expected: "object or array",
                        found: "absent",
                    })?;
                    self.node(out, indent + 1, Some(&entry_label), value, child, entry_comma)?;
                }
                Some(child) => match map.get(key) {
                    Some(current) => {
                        self.node(out, indent + 1, Some(&entry_label), current, child, entry_comma)?
                    }
                    None => {
                        self.node(out, indent + 1, Some(&entry_label), &Value::Null, child, entry_comma)?
                    }
                },
            }
        }

        self.close(out, SAME, indent, '}', comma);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn array(
        &self,
        out: &mut String,
        indent: usize,
        label: Option<&str>,
        items: &[Value],
        pre: &BTreeMap<usize, Delta>,
        post: &BTreeMap<usize, Delta>,
        comma: bool,
    ) -> Result<(), PatchError> {
        self.open(out, SAME, indent, label, '[');

        let mut slots: BTreeMap<usize, Slot> = post
            .iter()
            .map(|(index, child)| (*index, Slot::Child(child)))
            .collect();
        let mut removed: Vec<usize> = Vec::new(); // source indices leaving this array
        let mut survivors: Vec<usize> = Vec::new();
        for (&index, child) in pre {
            match child {
                Delta::Deleted(_) => removed.push(index),
                Delta::Moved { new_index, .. } => {
                    removed.push(index);
                    slots.insert(*new_index, Slot::MovedIn(index));
                }
                _ => return Err(PatchError::UnknownVariant("at a source index")),
            }
        }
        for index in 0..items.len() {
            if !pre.contains_key(&index) {
                survivors.push(index);
            }
        }

        let inserts = slots
            .values()
            .filter(|slot| matches!(slot, Slot::MovedIn(_) | Slot::Child(Delta::Added(_))))
            .count();
        let final_len = survivors.len() + inserts;
        let mut remaining = final_len + removed.len();

        let mut removed = removed.into_iter().peekable();
        let mut survivor = survivors.into_iter().peekable();

        // Interleave: each deleted source element prints just before the
        // first surviving element that followed it.
        for out_index in 0..final_len {
            match slots.get(&out_index) {
                Some(Slot::MovedIn(src)) => {
                    remaining -= 1;
                    let entry_label = self.index_label(out_index);
                    self.plain(
                        out,
                        ADDED,
                        indent + 1,
                        entry_label.as_deref(),
                        items.get(*src).ok_or(PatchError::InvalidIndex(*src))?,
                        remaining > 0,
                    );
                }
                Some(Slot::Child(child)) => match child {
                    Delta::Added(new) => {
                        remaining -= 1;
                        let entry_label = self.index_label(out_index);
                        self.plain(
                            out,
                            ADDED,
                            indent + 1,
                            entry_label.as_deref(),
                            new,
                            remaining > 0,
                        );
                    }
                    _ => {
                        let src = survivor.next().ok_or(PatchError::InvalidIndex(out_index))?;
                        self.flush_removed(out, indent, items, &mut removed, Some(src), &mut remaining)?;
                        remaining -= 1;
                        let entry_label = self.index_label(out_index);
                        self.node(
                            out,
                            indent + 1,
                            entry_label.as_deref(),
                            &items[src],
                            child,
                            remaining > 0,
                        )?;
                    }
                },
                None => {
                    let src = survivor.next().ok_or(PatchError::InvalidIndex(out_index))?;
                    self.flush_removed(out, indent, items, &mut removed, Some(src), &mut remaining)?;
                    remaining -= 1;
                    let entry_label = self.index_label(out_index);
                    self.plain(
                        out,
                        SAME,
                        indent + 1,
                        entry_label.as_deref(),
                        &items[src],
                        remaining > 0,
                    );
                }
            }
        }
        self.flush_removed(out, indent, items, &mut removed, None, &mut remaining)?;

        self.close(out, SAME, indent, ']', comma);
        Ok(())
    }

    fn flush_removed(
        &self,
        out: &mut String,
        indent: usize,
        items: &[Value],
        removed: &mut std::iter::Peekable<std::vec::IntoIter<usize>>,
        before: Option<usize>,
        remaining: &mut usize,
    ) -> Result<(), PatchError> {
        while let Some(&src) = removed.peek() {
            if let Some(limit) = before {
                if src > limit {
                    break;
                }
            }
            removed.next();
            *remaining -= 1;
            let entry_label = self.index_label(src);
            self.plain(
                out,
                DELETED,
                indent + 1,
                entry_label.as_deref(),
                items.get(src).ok_or(PatchError::InvalidIndex(src))?,
                *remaining > 0,
            );
        }
        Ok(())
    }

    fn index_label(&self, index: usize) -> Option<String> {
        self.show_array_index.then(|| format!("{index}: "))
    }

    // ── Line output ───────────────────────────────────────────────────────

    /// Print a whole value (no further edits inside) under one marker.
    fn plain(
        &self,
        out: &mut String,
        marker: char,
        indent: usize,
        label: Option<&str>,
        value: &Value,
        comma: bool,
    ) {
        match value {
            Value::Object(map) => {
                self.open(out, marker, indent, label, '{');
                let mut remaining = map.len();
                let keys: BTreeSet<&str> = map.keys().map(String::as_str).collect();
                for key in keys {
                    remaining -= 1;
                    let entry_label = format!("{key:?}: ");
                    self.plain(out, marker, indent + 1, Some(&entry_label), &map[key], remaining > 0);
                }
                self.close(out, marker, indent, '}', comma);
            }
            Value::Array(items) => {
                self.open(out, marker, indent, label, '[');
                let mut remaining = items.len();
                for (index, item) in items.iter().enumerate() {
                    remaining -= 1;
                    let entry_label = self.index_label(index);
                    self.plain(out, marker, indent + 1, entry_label.as_deref(), item, remaining > 0);
                }
                self.close(out, marker, indent, ']', comma);
            }
            scalar => {
                self.line(out, marker, indent, label, &scalar.to_string(), comma);
            }
        }
    }

    fn open(&self, out: &mut String, marker: char, indent: usize, label: Option<&str>, bracket: char) {
        self.line(out, marker, indent, label, &bracket.to_string(), false);
    }

    fn close(&self, out: &mut String, marker: char, indent: usize, bracket: char, comma: bool) {
        self.line(out, marker, indent, None, &bracket.to_string(), comma);
    }

    fn line(
        &self,
        out: &mut String,
        marker: char,
        indent: usize,
        label: Option<&str>,
        text: &str,
        comma: bool,
    ) {
        out.push(marker);
        for _ in 0..indent {
            out.push_str("  ");
        }
        if let Some(label) = label {
            out.push_str(label);
        }
        out.push_str(text);
        if comma {
            out.push(',');
        }
        out.push('\n');
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Differ;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(left: Value, right: Value) -> String {
        let delta = Differ::new().compare(&left, &right).expect("no diff");
        AsciiFormatter::new().format(&left, &delta).expect("format failed")
    }

    #[test]
    fn object_edits() {
        let text = render(
            json!({"keep": 1, "drop": 2, "change": "old"}),
            json!({"keep": 1, "add": 3, "change": "new"}),
        );
        assert_eq!(
            text,
            concat!(
                " {\n",
                "+  \"add\": 3,\n",
                "-  \"change\": \"old\",\n",
                "+  \"change\": \"new\",\n",
                "-  \"drop\": 2,\n",
                "   \"keep\": 1\n",
                " }\n",
            )
        );
    }

    #[test]
    fn array_addition_and_deletion() {
        let text = render(json!({"a": [1, 2, 3]}), json!({"a": [1, 3, 9]}));
        assert_eq!(
            text,
            concat!(
                " {\n",
                "   \"a\": [\n",
                "     1,\n",
                "-    2,\n",
                "     3,\n",
                "+    9\n",
                "   ]\n",
                " }\n",
            )
        );
    }

    #[test]
    fn array_move_renders_as_remove_plus_add() {
        let text = render(json!([1, 2, 3]), json!([1, 3, 2]));
        assert_eq!(
            text,
            concat!(
                " [\n",
                "   1,\n",
                "-  2,\n",
                "   3,\n",
                "+  2\n",
                " ]\n",
            )
        );
    }

    #[test]
    fn nested_container_renders_in_place() {
        let text = render(json!({"o": {"x": 1}}), json!({"o": {"x": 2}}));
        assert_eq!(
            text,
            concat!(
                " {\n",
                "   \"o\": {\n",
                "-    \"x\": 1\n",
                "+    \"x\": 2\n",
                "   }\n",
                " }\n",
            )
        );
    }

    #[test]
    fn array_index_labels() {
        let left = json!([10, 20]);
        let delta = Differ::new().compare(&left, &json!([10, 21])).unwrap();
        let formatter = AsciiFormatter {
            show_array_index: true,
        };
        let text = formatter.format(&left, &delta).unwrap();
        assert_eq!(
            text,
            concat!(
                " [\n",
                "   0: 10,\n",
                "-  1: 20\n",
                "+  1: 21\n",
                " ]\n",
            )
        );
    }

    #[test]
    fn whole_value_rendering_recurses() {
        let text = render(json!({"a": 1}), json!({"a": 1, "b": {"c": [1, 2]}}));
        assert_eq!(
            text,
            concat!(
                " {\n",
                "   \"a\": 1,\n",
                "+  \"b\": {\n",
                "+    \"c\": [\n",
                "+      1,\n",
                "+      2\n",
                "+    ]\n",
                "+  }\n",
                " }\n",
            )
        );
    }
}
