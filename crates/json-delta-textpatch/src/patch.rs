//! Patch objects over the character diff.
//!
//! Follows the `diff-match-patch` patch model: hunks carry the edit runs
//! plus a few characters of surrounding context, apply independently with
//! per-hunk success reporting, and serialize to the GNU-diff-style unified
//! text format (`@@ -a,b +c,d @@` headers, URI-encoded lines).

use std::fmt;
use std::sync::OnceLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;

use crate::diff::{diff, find_sub, source_text, target_text, Chunk, ChunkKind};

// ── Types ─────────────────────────────────────────────────────────────────

/// Context chars kept on each side of a hunk.
const PATCH_MARGIN: usize = 4;

/// Cap on context growth while making a hunk's pattern unique.
const MAX_PATTERN: usize = 64;

/// One patch hunk.
///
/// `start1`/`length1` locate the hunk in the source string, `start2`/
/// `length2` in the destination string. All values count `char`s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub diffs: Vec<Chunk>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum TextPatchError {
    #[error("malformed patch header: {0}")]
    BadHeader(String),
    #[error("malformed patch line: {0}")]
    BadLine(String),
    #[error("invalid character encoding in patch text")]
    BadEncoding,
}

// ── Patch construction ────────────────────────────────────────────────────

/// Build the list of hunks transforming `src` into `dst`.
///
/// Returns an empty list when the strings are equal.
pub fn make_patch(src: &str, dst: &str) -> Vec<Patch> {
    let chunks = diff(src, dst);
    let mut patches = Vec::new();
    if chunks.iter().all(|(kind, _)| *kind == ChunkKind::Equal) {
        return patches;
    }

    let mut patch = Patch::default();
    let mut char_count1 = 0usize; // chars into prepatch
    let mut char_count2 = 0usize; // chars into postpatch
    let mut prepatch: Vec<char> = src.chars().collect();
    let mut postpatch: Vec<char> = prepatch.clone();

    let last = chunks.len() - 1;
    for (i, (kind, text)) in chunks.iter().enumerate() {
        let text_len = text.chars().count();
        if patch.diffs.is_empty() && *kind != ChunkKind::Equal {
            patch.start1 = char_count1;
            patch.start2 = char_count2;
        }

        match kind {
            ChunkKind::Insert => {
                patch.diffs.push((ChunkKind::Insert, text.clone()));
                patch.length2 += text_len;
                let _ = postpatch.splice(char_count2..char_count2, text.chars());
            }
            ChunkKind::Delete => {
                patch.diffs.push((ChunkKind::Delete, text.clone()));
                patch.length1 += text_len;
                let _ = postpatch.splice(char_count2..char_count2 + text_len, std::iter::empty());
            }
            ChunkKind::Equal => {
                if text_len <= 2 * PATCH_MARGIN && !patch.diffs.is_empty() && i != last {
                    patch.diffs.push((ChunkKind::Equal, text.clone()));
                    patch.length1 += text_len;
                    patch.length2 += text_len;
                } else if text_len >= 2 * PATCH_MARGIN && !patch.diffs.is_empty() {
                    // A large equality ends the hunk.
                    add_context(&mut patch, &prepatch);
                    patches.push(std::mem::take(&mut patch));
                    prepatch = postpatch.clone();
                    char_count1 = char_count2;
                }
            }
        }

        if *kind != ChunkKind::Insert {
            char_count1 += text_len;
        }
        if *kind != ChunkKind::Delete {
            char_count2 += text_len;
        }
    }
    if !patch.diffs.is_empty() {
        add_context(&mut patch, &prepatch);
        patches.push(patch);
    }

    patches
}

/// Grow the hunk with surrounding context until its pattern is unique in
/// `text` (or the growth cap is hit), then add the margin itself.
fn add_context(patch: &mut Patch, text: &[char]) {
    if text.is_empty() {
        return;
    }
    let mut pattern = &text[patch.start2..patch.start2 + patch.length1];
    let mut padding = 0usize;
    while occurs_more_than_once(text, pattern) && pattern.len() < MAX_PATTERN {
        padding += PATCH_MARGIN;
        let lo = patch.start2.saturating_sub(padding);
        let hi = (patch.start2 + patch.length1 + padding).min(text.len());
        pattern = &text[lo..hi];
    }
    padding += PATCH_MARGIN;

    let lo = patch.start2.saturating_sub(padding);
    let prefix: String = text[lo..patch.start2].iter().collect();
    let hi = (patch.start2 + patch.length1 + padding).min(text.len());
    let suffix: String = text[patch.start2 + patch.length1..hi].iter().collect();

    let prefix_len = prefix.chars().count();
    let suffix_len = suffix.chars().count();
    if !prefix.is_empty() {
        patch.diffs.insert(0, (ChunkKind::Equal, prefix));
    }
    if !suffix.is_empty() {
        patch.diffs.push((ChunkKind::Equal, suffix));
    }
    patch.start1 -= prefix_len;
    patch.start2 -= prefix_len;
    patch.length1 += prefix_len + suffix_len;
    patch.length2 += prefix_len + suffix_len;
}

fn occurs_more_than_once(text: &[char], pattern: &[char]) -> bool {
    match find_sub(text, pattern) {
        None => false,
        Some(first) => find_sub(&text[first + 1..], pattern).is_some(),
    }
}

// ── Patch application ─────────────────────────────────────────────────────

/// Apply hunks to `src`, returning the patched string and one success flag
/// per hunk.
///
/// Each hunk is matched exactly at its expected location first; failing
/// that, at the first occurrence of its source run anywhere in the text. A
/// hunk that matches nowhere is skipped and reported `false`.
pub fn apply_patch(patches: &[Patch], src: &str) -> (String, Vec<bool>) {
    if patches.is_empty() {
        return (src.to_string(), Vec::new());
    }

    let mut text: Vec<char> = src.chars().collect();
    let mut results = vec![false; patches.len()];
    let mut delta: i64 = 0;

    for (i, patch) in patches.iter().enumerate() {
        let expected = patch.start2 as i64 + delta;
        let text1: Vec<char> = source_text(&patch.diffs).chars().collect();

        let found = if expected >= 0
            && expected as usize + text1.len() <= text.len()
            && text[expected as usize..expected as usize + text1.len()] == text1[..]
        {
            Some(expected as usize)
        } else {
            find_sub(&text, &text1)
        };

        match found {
            None => {
                // Coordinates of later hunks assumed this one applied.
                delta -= patch.length2 as i64 - patch.length1 as i64;
            }
            Some(at) => {
                results[i] = true;
                delta = at as i64 - patch.start2 as i64;
                let text2: Vec<char> = target_text(&patch.diffs).chars().collect();
                let _ = text.splice(at..at + text1.len(), text2);
            }
        }
    }

    (text.into_iter().collect(), results)
}

// ── Text format ───────────────────────────────────────────────────────────

// `encodeURI` escape set, with the space character additionally literal.
const URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

impl fmt::Display for Patch {
    /// The unified-format header and lines for one hunk.
    ///
    /// Coordinates are printed 1-based, except that an empty range prints
    /// its 0-based start, and a length of 1 omits the length.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coords1 = match self.length1 {
            0 => format!("{},0", self.start1),
            1 => format!("{}", self.start1 + 1),
            n => format!("{},{}", self.start1 + 1, n),
        };
        let coords2 = match self.length2 {
            0 => format!("{},0", self.start2),
            1 => format!("{}", self.start2 + 1),
            n => format!("{},{}", self.start2 + 1, n),
        };
        writeln!(f, "@@ -{coords1} +{coords2} @@")?;
        for (kind, text) in &self.diffs {
            let sign = match kind {
                ChunkKind::Insert => '+',
                ChunkKind::Delete => '-',
                ChunkKind::Equal => ' ',
            };
            writeln!(f, "{sign}{}", utf8_percent_encode(text, URI))?;
        }
        Ok(())
    }
}

/// Serialize hunks to the on-wire text form.
pub fn patch_to_text(patches: &[Patch]) -> String {
    let mut out = String::new();
    for patch in patches {
        out.push_str(&patch.to_string());
    }
    out
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@$").unwrap())
}

fn parse_coords(start: &str, length: Option<&str>) -> Result<(usize, usize), TextPatchError> {
    let start: usize = start
        .parse()
        .map_err(|_| TextPatchError::BadHeader(start.to_string()))?;
    match length {
        None => Ok((start - start.min(1), 1)),
        Some("0") => Ok((start, 0)),
        Some(len) => {
            let len: usize = len
                .parse()
                .map_err(|_| TextPatchError::BadHeader(len.to_string()))?;
            Ok((start - start.min(1), len))
        }
    }
}

/// Parse the on-wire text form back into hunks.
pub fn patch_from_text(text: &str) -> Result<Vec<Patch>, TextPatchError> {
    let mut patches = Vec::new();
    if text.is_empty() {
        return Ok(patches);
    }

    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let caps = header_re()
            .captures(line)
            .ok_or_else(|| TextPatchError::BadHeader(line.to_string()))?;

        let mut patch = Patch::default();
        let (start1, length1) =
            parse_coords(&caps[1], caps.get(2).map(|m| m.as_str()))?;
        let (start2, length2) =
            parse_coords(&caps[3], caps.get(4).map(|m| m.as_str()))?;
        patch.start1 = start1;
        patch.length1 = length1;
        patch.start2 = start2;
        patch.length2 = length2;

        while let Some(&body) = lines.peek() {
            if body.is_empty() {
                lines.next();
                continue;
            }
            if body.starts_with("@@") {
                break;
            }
            lines.next();
            let kind = match body.chars().next() {
                Some('+') => ChunkKind::Insert,
                Some('-') => ChunkKind::Delete,
                Some(' ') => ChunkKind::Equal,
                _ => return Err(TextPatchError::BadLine(body.to_string())),
            };
            let decoded = percent_decode_str(&body[1..])
                .decode_utf8()
                .map_err(|_| TextPatchError::BadEncoding)?
                .into_owned();
            patch.diffs.push((kind, decoded));
        }

        patches.push(patch);
    }

    Ok(patches)
}

// ── Tests ─────────────────────────────────────────────────────────────────
