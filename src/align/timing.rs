//! Alignment output types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UnitTiming
// ---------------------------------------------------------------------------

/// Where one narration unit sits in the final audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTiming {
    pub unit_index: usize,
    /// Seconds from the start of the audio.
    pub start_time: f64,
    /// Seconds from the start of the audio.
    pub end_time: f64,
    /// `end_time - start_time`, never negative.
    pub duration: f64,
    /// Similarity between the unit text and the matched transcript window,
    /// in `[0, 1]`.  `0.0` marks a unit that could not be matched.
    pub confidence: f64,
    /// Transcript text the unit was matched to (empty when unmatched).
    pub matched_text: String,
}

impl UnitTiming {
    /// Zero timing for a unit with no acceptable transcript window.
    pub fn unmatched(unit_index: usize) -> Self {
        Self {
            unit_index,
            start_time: 0.0,
            end_time: 0.0,
            duration: 0.0,
            confidence: 0.0,
            matched_text: String::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.confidence > 0.0
    }
}

// ---------------------------------------------------------------------------
// AlignmentReport
// ---------------------------------------------------------------------------

/// Timings for every unit plus the aggregate accuracy metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// One entry per narration unit, in unit order.
    pub timings: Vec<UnitTiming>,
    /// Aggregate accuracy in `[0, 100]`.
    pub accuracy: f64,
    /// Indices of units that received a zero timing.
    pub unmatched: Vec<usize>,
}

impl AlignmentReport {
    pub fn matched_count(&self) -> usize {
        self.timings.len() - self.unmatched.len()
    }
}
