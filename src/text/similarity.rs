//! Longest-matching-blocks similarity ratio (Ratcliff/Obershelp).
//!
//! The ratio is `2·M / T` where `T` is the total length of both inputs and
//! `M` is the number of characters covered by matching blocks.  Blocks are
//! found by taking the longest common substring, then recursing into the
//! unmatched text to its left and to its right.  Lengths are measured in
//! Unicode scalar values, not bytes.

use std::collections::HashMap;

use super::normalize;

/// Similarity of two strings in `[0.0, 1.0]`.
///
/// Two empty strings are identical (`1.0`); one empty string against a
/// non-empty one scores `0.0`.
///
/// ```
/// use narration_sync::text::similarity_ratio;
///
/// assert_eq!(similarity_ratio("abcd", "abcd"), 1.0);
/// assert_eq!(similarity_ratio("abcd", "wxyz"), 0.0);
/// assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
/// ```
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_characters(&a, &b);
    (2 * matched) as f64 / total as f64
}

/// [`similarity_ratio`] of the [`normalize`]d forms of `a` and `b`.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    similarity_ratio(&normalize(a), &normalize(b))
}

// ---------------------------------------------------------------------------
// Matching blocks
// ---------------------------------------------------------------------------

/// Total size of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Positions of every character in `b`, ascending.
    let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b_index.entry(c).or_default().push(j);
    }

    let mut rows = RunRows::new(b.len());
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b_index, &mut rows, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }

    matched
}

/// Two rows of match-run lengths, reused across [`longest_match`] calls.
///
/// `prev[j + 1]` is the length of the run ending at `(i - 1, j)`.  Only the
/// touched entries are reset, so a row costs what its matches cost and not
/// the length of `b`.
struct RunRows {
    prev: Vec<usize>,
    curr: Vec<usize>,
    prev_touched: Vec<usize>,
    curr_touched: Vec<usize>,
}

impl RunRows {
    fn new(b_len: usize) -> Self {
        Self {
            prev: vec![0; b_len + 1],
            curr: vec![0; b_len + 1],
            prev_touched: Vec::new(),
            curr_touched: Vec::new(),
        }
    }

    /// Make the current row the previous one and clear the new current row.
    fn advance(&mut self) {
        for &t in &self.prev_touched {
            self.prev[t] = 0;
        }
        self.prev_touched.clear();
        std::mem::swap(&mut self.prev, &mut self.curr);
        std::mem::swap(&mut self.prev_touched, &mut self.curr_touched);
    }

    /// Zero both rows.  The current row is always clean between columns.
    fn reset(&mut self) {
        self.advance();
    }
}

/// Longest common substring of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
///
/// Returns `(start_in_a, start_in_b, length)`.  Among equally long matches
/// the one starting earliest in `a` (then in `b`) wins.
fn longest_match(
    a: &[char],
    b_index: &HashMap<char, Vec<usize>>,
    rows: &mut RunRows,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);

    for (i, c) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        if let Some(positions) = b_index.get(c) {
            let start = positions.partition_point(|&j| j < b_lo);
            for &j in &positions[start..] {
                if j >= b_hi {
                    break;
                }
                let k = rows.prev[j] + 1;
                rows.curr[j + 1] = k;
                rows.curr_touched.push(j + 1);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        rows.advance();
    }
    rows.reset();

    (best_i, best_j, best_size)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
