//! Best-window search: which run of transcript segments speaks a unit.
//!
//! Every contiguous window of segments (all start offsets × all window
//! sizes) is scored against the unit text; the highest-scoring window wins
//! if it clears the minimum match ratio.  The search is cubic-ish in the
//! number of segments in the worst case.  Windows that have grown too long to
//! beat the current best are abandoned, which keeps transcripts of a few
//! hundred segments fast; `max_window` caps the window size for longer ones.

use crate::stt::TranscriptSegment;
use crate::text::{normalize, similarity_ratio};

/// The winning window for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMatch {
    /// Index of the first segment in the window.
    pub first: usize,
    /// Index of the last segment in the window (inclusive).
    pub last: usize,
    /// Similarity between the unit and the window, in `[0, 1]`.
    pub ratio: f64,
}

/// Segment texts in normalized form, computed once per alignment run.
pub struct NormalizedSegments<'a> {
    segments: &'a [TranscriptSegment],
    normalized: Vec<String>,
    /// Char count of each normalized text.
    lengths: Vec<usize>,
}

impl<'a> NormalizedSegments<'a> {
    pub fn new(segments: &'a [TranscriptSegment]) -> Self {
        let normalized: Vec<String> = segments.iter().map(|s| normalize(&s.text)).collect();
        let lengths = normalized.iter().map(|t| t.chars().count()).collect();
        Self {
            segments,
            normalized,
            lengths,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The highest-scoring window for `unit_text`, regardless of threshold.
    ///
    /// Ties keep the earliest window (lowest start, then shortest).  Returns
    /// `None` only when there are no segments.
    pub fn best_window(&self, unit_text: &str, max_window: Option<usize>) -> Option<WindowMatch> {
        let target = normalize(unit_text);
        let target_len = target.chars().count();
        let max_window = max_window.unwrap_or(usize::MAX).max(1);
        let mut best: Option<WindowMatch> = None;

        for first in 0..self.len() {
            let limit = self.len().min(first.saturating_add(max_window));
            let mut joined = String::new();
            let mut joined_len = 0;

            for last in first..limit {
                joined.push_str(&self.normalized[last]);
                joined_len += self.lengths[last];

                // Growing the window only lowers this bound, so no longer
                // window from `first` can beat the current best.
                if let Some(b) = &best {
                    if ratio_upper_bound(target_len, joined_len) <= b.ratio {
                        break;
                    }
                }

                let ratio = similarity_ratio(&target, &joined);
                if best.as_ref().map_or(true, |b| ratio > b.ratio) {
                    best = Some(WindowMatch { first, last, ratio });
                    if ratio >= 1.0 {
                        return best;
                    }
                }
            }
        }

        best
    }

    /// Raw (un-normalized) text of a window, segments joined by a space.
    pub fn window_text(&self, window: &WindowMatch) -> String {
        self.segments[window.first..=window.last]
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `(start, end)` of a window: first segment's start, last segment's end.
    pub fn window_span(&self, window: &WindowMatch) -> (f64, f64) {
        (
            self.segments[window.first].start,
            self.segments[window.last].end,
        )
    }
}

/// Highest ratio a target of `target_len` chars can reach against a text of
/// `other_len` chars: every target char matched.  Non-increasing in
/// `other_len`.
fn ratio_upper_bound(target_len: usize, other_len: usize) -> f64 {
    let total = target_len + other_len;
    if total == 0 {
        return 1.0;
    }
    (2 * target_len) as f64 / total as f64
}
