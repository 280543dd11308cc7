//! Text patching for string modifications.
//!
//! A character-level Myers diff plus the `diff-match-patch` patch object
//! model: building patch hunks from two strings, applying them with
//! per-hunk success reporting, and (de)serializing the unified text
//! format. Consumed by `json-delta` for long-string deltas.

pub mod diff;
pub mod patch;

pub use diff::{diff, source_text, target_text, Chunk, ChunkKind};
pub use patch::{apply_patch, make_patch, patch_from_text, patch_to_text, Patch, TextPatchError};
