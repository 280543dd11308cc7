//! Structural JSON diff and patch.
//!
//! Compares two `serde_json::Value` trees into a [`Delta`] describing how
//! to turn the left one into the right one, applies such deltas, and
//! (de)serializes them in the `jsondiffpatch` wire format. Array alignment
//! anchors equal elements with an LCS, extracts moves among the leftovers,
//! and pairs up the rest by maximizing similarity, so in-place
//! modifications win over unrelated delete-plus-add churn. Long string
//! changes are carried as text patches.

pub mod apply;
pub mod codec;
pub mod compare;
pub mod delta;
pub mod formatter;
pub mod lcs;
pub mod value;

pub use apply::{apply_delta, PatchError};
pub use compare::{DiffOptions, Differ};
pub use delta::Delta;
pub use formatter::AsciiFormatter;
pub use value::Kind;
