//! Character-level string diff — Myers O(ND) difference algorithm.
//!
//! All positions and lengths are in **Unicode scalar values** (Rust
//! `char`s), not bytes.

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Delete,
    Equal,
    Insert,
}

/// One run of the diff: a kind and the text it covers.
pub type Chunk = (ChunkKind, String);

// ── Public API ────────────────────────────────────────────────────────────

/// Compute the diff between `src` and `dst`.
///
/// Equal runs are included for context. Consecutive chunks of the same
/// kind are merged and empty chunks are dropped.
pub fn diff(src: &str, dst: &str) -> Vec<Chunk> {
    if src == dst {
        return if src.is_empty() {
            vec![]
        } else {
            vec![(ChunkKind::Equal, src.to_string())]
        };
    }

    let src_chars: Vec<char> = src.chars().collect();
    let dst_chars: Vec<char> = dst.chars().collect();

    let prefix_len = common_prefix(&src_chars, &dst_chars);
    let prefix = collect(&src_chars[..prefix_len]);
    let src_mid = &src_chars[prefix_len..];
    let dst_mid = &dst_chars[prefix_len..];

    let suffix_len = common_suffix(src_mid, dst_mid);
    let suffix = collect(&src_mid[src_mid.len() - suffix_len..]);
    let src_mid = &src_mid[..src_mid.len() - suffix_len];
    let dst_mid = &dst_mid[..dst_mid.len() - suffix_len];

    let mut chunks = diff_middle(src_mid, dst_mid);
    if !prefix.is_empty() {
        chunks.insert(0, (ChunkKind::Equal, prefix));
    }
    if !suffix.is_empty() {
        chunks.push((ChunkKind::Equal, suffix));
    }

    cleanup_merge(&mut chunks);
    chunks
}

/// Reconstruct the source string (equal + deleted runs).
pub fn source_text(chunks: &[Chunk]) -> String {
    let mut txt = String::new();
    for (kind, text) in chunks {
        if *kind != ChunkKind::Insert {
            txt.push_str(text);
        }
    }
    txt
}

/// Reconstruct the destination string (equal + inserted runs).
pub fn target_text(chunks: &[Chunk]) -> String {
    let mut txt = String::new();
    for (kind, text) in chunks {
        if *kind != ChunkKind::Delete {
            txt.push_str(text);
        }
    }
    txt
}

// ── Char-slice helpers ────────────────────────────────────────────────────

/// Chars shared at the front of two slices.
fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Chars shared at the back of two slices.
fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// First occurrence of `needle` in `haystack`.
pub(crate) fn find_sub(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

// ── Core algorithm ────────────────────────────────────────────────────────

/// Diff two blocks known to share no common affix.
fn diff_middle(a: &[char], b: &[char]) -> Vec<Chunk> {
    if a.is_empty() {
        return if b.is_empty() {
            vec![]
        } else {
            vec![(ChunkKind::Insert, collect(b))]
        };
    }
    if b.is_empty() {
        return vec![(ChunkKind::Delete, collect(a))];
    }

    // Containment fast path: the shorter block inside the longer one.
    let (long, short, long_is_src) = if a.len() > b.len() {
        (a, b, true)
    } else {
        (b, a, false)
    };
    if let Some(at) = find_sub(long, short) {
        let edit = if long_is_src {
            ChunkKind::Delete
        } else {
            ChunkKind::Insert
        };
        let mut chunks = Vec::with_capacity(3);
        if at > 0 {
            chunks.push((edit, collect(&long[..at])));
        }
        chunks.push((ChunkKind::Equal, collect(short)));
        if at + short.len() < long.len() {
            chunks.push((edit, collect(&long[at + short.len()..])));
        }
        return chunks;
    }

    if short.len() == 1 {
        // Single char on one side with no match on the other.
        return vec![
            (ChunkKind::Delete, collect(a)),
            (ChunkKind::Insert, collect(b)),
        ];
    }

    bisect(a, b)
}

// ── Middle-snake search ───────────────────────────────────────────────────

/// Furthest-reaching `x` per diagonal for one direction of the search.
///
/// Diagonal `k` holds the largest `x` (with `y = x - k`) reached so far,
/// or -1 for a diagonal that is unexplored or has walked off the grid.
struct Frontier {
    reach: Vec<i64>,
    origin: i64,
}

impl Frontier {
    fn new(span: usize) -> Self {
        let mut frontier = Frontier {
            reach: vec![-1; 2 * span + 2],
            origin: span as i64,
        };
        // Seed so the first step lands on diagonal 0 at x = 0.
        frontier.set(1, 0);
        frontier
    }

    fn get(&self, k: i64) -> i64 {
        self.reach[(k + self.origin) as usize]
    }

    /// Like `get`, but tolerates diagonals outside the band.
    fn probe(&self, k: i64) -> i64 {
        match usize::try_from(k + self.origin) {
            Ok(i) if i < self.reach.len() => self.reach[i],
            _ => -1,
        }
    }

    fn set(&mut self, k: i64, x: i64) {
        let i = (k + self.origin) as usize;
        self.reach[i] = x;
    }

    /// One round of the search: push every diagonal of this depth one
    /// edit further, then slide along its snake of matching chars.
    fn expand(&mut self, depth: i64, a: &[char], b: &[char]) {
        let na = a.len() as i64;
        let nb = b.len() as i64;
        let mut k = -depth;
        while k <= depth {
            let step_down = k == -depth || (k != depth && self.get(k - 1) < self.get(k + 1));
            let mut x = if step_down {
                self.get(k + 1)
            } else {
                self.get(k - 1) + 1
            };
            let mut y = x - k;
            if x < 0 || y < 0 || x > na || y > nb {
                // Dead diagonal: walked off the grid.
                self.set(k, -1);
            } else {
                while x < na && y < nb && a[x as usize] == b[y as usize] {
                    x += 1;
                    y += 1;
                }
                self.set(k, x);
            }
            k += 2;
        }
    }
}

/// Scan the diagonals just expanded in `scan` for one that meets the
/// opposite frontier, returning the meeting point in forward-grid
/// coordinates. `flipped` marks `scan` as the backward frontier, whose
/// `x` counts from the far corner.
#[allow(clippy::too_many_arguments)]
fn meeting(
    scan: &Frontier,
    other: &Frontier,
    depth: i64,
    na: i64,
    nb: i64,
    shift: i64,
    flipped: bool,
) -> Option<(usize, usize)> {
    let mut k = -depth;
    while k <= depth {
        let x = scan.get(k);
        let other_x = other.probe(shift - k);
        if x >= 0 && other_x >= 0 && x + other_x >= na {
            let (fx, fk) = if flipped { (other_x, shift - k) } else { (x, k) };
            let fy = fx - fk;
            // Corner touches split nothing off; keep scanning.
            if fx + fy > 0 && fx + fy < na + nb {
                return Some((fx as usize, fy as usize));
            }
        }
        k += 2;
    }
    None
}

/// Walk the edit grid from both corners at once and split the problem at
/// a point both walks reach.
fn bisect(a: &[char], b: &[char]) -> Vec<Chunk> {
    let na = a.len() as i64;
    let nb = b.len() as i64;
    // The backward walk is a forward walk over the reversed inputs.
    let reversed_a: Vec<char> = a.iter().rev().copied().collect();
    let reversed_b: Vec<char> = b.iter().rev().copied().collect();

    // Forward diagonal k and backward diagonal `shift - k` describe the
    // same line of the grid. An odd shift means the walks can first touch
    // after a forward round, an even one after a backward round.
    let shift = na - nb;
    let touch_after_forward = shift % 2 != 0;

    let rounds = (a.len() + b.len()).div_ceil(2) + 1;
    let mut forward = Frontier::new(rounds);
    let mut backward = Frontier::new(rounds);

    for depth in 0..rounds as i64 {
        forward.expand(depth, a, b);
        if touch_after_forward {
            if let Some((x, y)) = meeting(&forward, &backward, depth, na, nb, shift, false) {
                return recurse_halves(a, b, x, y);
            }
        }

        backward.expand(depth, &reversed_a, &reversed_b);
        if !touch_after_forward {
            if let Some((x, y)) = meeting(&backward, &forward, depth, na, nb, shift, true) {
                return recurse_halves(a, b, x, y);
            }
        }
    }

    // The walks never met: nothing in common.
    vec![
        (ChunkKind::Delete, collect(a)),
        (ChunkKind::Insert, collect(b)),
    ]
}

fn recurse_halves(a: &[char], b: &[char], x: usize, y: usize) -> Vec<Chunk> {
    let mut chunks = diff(&collect(&a[..x]), &collect(&b[..y]));
    chunks.extend(diff(&collect(&a[x..]), &collect(&b[y..])));
    chunks
}

// ── Chunk cleanup ─────────────────────────────────────────────────────────

/// Normalize a chunk list: coalesce runs, pull shared affixes of each
/// delete/insert cluster into the neighbouring equalities, and slide lone
/// edits over equalities they overlap. Runs to a fixed point.
fn cleanup_merge(chunks: &mut Vec<Chunk>) {
    loop {
        *chunks = coalesce(std::mem::take(chunks));
        if !slide_edits(chunks) {
            break;
        }
    }
}

/// Rebuild the list with every delete/insert cluster reduced to at most
/// one chunk of each kind and adjacent equalities merged.
fn coalesce(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    let mut deleted = String::new();
    let mut inserted = String::new();
    for (kind, text) in chunks {
        if text.is_empty() {
            continue;
        }
        match kind {
            ChunkKind::Delete => deleted.push_str(&text),
            ChunkKind::Insert => inserted.push_str(&text),
            ChunkKind::Equal => {
                let handed_over = flush_cluster(&mut out, &mut deleted, &mut inserted);
                push_equal(&mut out, handed_over + &text);
            }
        }
    }
    let handed_over = flush_cluster(&mut out, &mut deleted, &mut inserted);
    push_equal(&mut out, handed_over);
    out
}

/// Append equal text, merging into a trailing equality.
fn push_equal(out: &mut Vec<Chunk>, text: String) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some((ChunkKind::Equal, last)) => last.push_str(&text),
        _ => out.push((ChunkKind::Equal, text)),
    }
}

/// Emit one pending delete/insert cluster. A prefix shared by both sides
/// joins the preceding equality; a shared suffix is returned for the
/// caller to put in front of the following one.
fn flush_cluster(out: &mut Vec<Chunk>, deleted: &mut String, inserted: &mut String) -> String {
    let mut handed_over = String::new();
    if !deleted.is_empty() && !inserted.is_empty() {
        let del_chars: Vec<char> = deleted.chars().collect();
        let ins_chars: Vec<char> = inserted.chars().collect();
        let front = common_prefix(&del_chars, &ins_chars);
        let back = common_suffix(&del_chars[front..], &ins_chars[front..]);
        if front > 0 {
            push_equal(out, del_chars[..front].iter().collect());
        }
        handed_over = del_chars[del_chars.len() - back..].iter().collect();
        *deleted = del_chars[front..del_chars.len() - back].iter().collect();
        *inserted = ins_chars[front..ins_chars.len() - back].iter().collect();
    }
    if !deleted.is_empty() {
        out.push((ChunkKind::Delete, std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push((ChunkKind::Insert, std::mem::take(inserted)));
    }
    handed_over
}

/// An edit flanked by equalities that overlaps one of them entirely can
/// absorb it, uncovering a larger equality on the other side.
fn slide_edits(chunks: &mut Vec<Chunk>) -> bool {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < chunks.len() {
        if chunks[i - 1].0 != ChunkKind::Equal || chunks[i + 1].0 != ChunkKind::Equal {
            i += 1;
            continue;
        }
        let before = chunks[i - 1].1.clone();
        let after = chunks[i + 1].1.clone();
        if chunks[i].1.ends_with(&before) {
            // Rotate the edit left over `before`.
            let kept = chunks[i].1[..chunks[i].1.len() - before.len()].to_string();
            chunks[i].1 = format!("{before}{kept}");
            chunks[i + 1].1 = format!("{before}{after}");
            chunks.remove(i - 1);
            changed = true;
        } else if chunks[i].1.starts_with(&after) {
            // Rotate the edit right over `after`.
            let kept = chunks[i].1[after.len()..].to_string();
            chunks[i - 1].1.push_str(&after);
            chunks[i].1 = format!("{kept}{after}");
            chunks.remove(i + 1);
            changed = true;
            i += 1;
        } else {
            i += 1;
        }
    }
    changed
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings() {
        let d = diff("hello", "hello");
        assert_eq!(d, vec![(ChunkKind::Equal, "hello".to_string())]);
    }

    #[test]
    fn empty_both() {
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn empty_src() {
        let d = diff("", "hello");
        assert_eq!(d, vec![(ChunkKind::Insert, "hello".to_string())]);
    }

    #[test]
    fn empty_dst() {
        let d = diff("hello", "");
        assert_eq!(d, vec![(ChunkKind::Delete, "hello".to_string())]);
    }

    #[test]
    fn simple_insert() {
        let d = diff("ac", "abc");
        assert_eq!(source_text(&d), "ac");
        assert_eq!(target_text(&d), "abc");
    }

    #[test]
    fn simple_delete() {
        let d = diff("abc", "ac");
        assert_eq!(source_text(&d), "abc");
        assert_eq!(target_text(&d), "ac");
    }

    #[test]
    fn replacement_roundtrip() {
        let s = "the quick brown fox";
        let t = "the slow green fox";
        let d = diff(s, t);
        assert_eq!(source_text(&d), s);
        assert_eq!(target_text(&d), t);
    }

    #[test]
    fn unrelated_strings() {
        let d = diff("abcdef", "uvwxyz");
        assert_eq!(source_text(&d), "abcdef");
        assert_eq!(target_text(&d), "uvwxyz");
    }

    #[test]
    fn interleaved_common_chars() {
        let d = diff("abcabba", "cbabac");
        assert_eq!(source_text(&d), "abcabba");
        assert_eq!(target_text(&d), "cbabac");
    }

    #[test]
    fn multibyte_chars() {
        let d = diff("caf\u{e9} noir", "caf\u{e9} blanc");
        assert_eq!(source_text(&d), "caf\u{e9} noir");
        assert_eq!(target_text(&d), "caf\u{e9} blanc");
    }

    #[test]
    fn prefix_lengths() {
        let a: Vec<char> = "hello".chars().collect();
        let b: Vec<char> = "helloworld".chars().collect();
        assert_eq!(common_prefix(&a, &b), 5);
        let c: Vec<char> = "xyz".chars().collect();
        assert_eq!(common_prefix(&a, &c), 0);
    }

    #[test]
    fn suffix_lengths() {
        let a: Vec<char> = "hello".chars().collect();
        let b: Vec<char> = "jello".chars().collect();
        assert_eq!(common_suffix(&a, &b), 4);
        let c: Vec<char> = "world".chars().collect();
        assert_eq!(common_suffix(&a, &c), 0);
    }

    #[test]
    fn merged_chunks_have_no_adjacent_duplicates() {
        let d = diff("mouse", "sofas");
        for pair in d.windows(2) {
            assert_ne!(pair[0].0, pair[1].0);
        }
        assert_eq!(source_text(&d), "mouse");
        assert_eq!(target_text(&d), "sofas");
    }

    #[test]
    fn cleanup_factors_shared_affixes() {
        let mut chunks = vec![
            (ChunkKind::Equal, "ab".to_string()),
            (ChunkKind::Delete, "xcy".to_string()),
            (ChunkKind::Insert, "xdy".to_string()),
            (ChunkKind::Equal, "ef".to_string()),
        ];
        cleanup_merge(&mut chunks);
        assert_eq!(
            chunks,
            vec![
                (ChunkKind::Equal, "abx".to_string()),
                (ChunkKind::Delete, "c".to_string()),
                (ChunkKind::Insert, "d".to_string()),
                (ChunkKind::Equal, "yef".to_string()),
            ]
        );
    }

    #[test]
    fn cleanup_slides_edit_over_equality() {
        let mut chunks = vec![
            (ChunkKind::Equal, "a".to_string()),
            (ChunkKind::Insert, "ba".to_string()),
            (ChunkKind::Equal, "c".to_string()),
        ];
        cleanup_merge(&mut chunks);
        assert_eq!(
            chunks,
            vec![
                (ChunkKind::Insert, "ab".to_string()),
                (ChunkKind::Equal, "ac".to_string()),
            ]
        );
    }
}
