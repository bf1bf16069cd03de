//! Segment aligner: maps transcript segments back onto narration units.
//!
//! # Flow
//!
//! ```text
//! validate input ──▶ per unit: best transcript window (ratio ≥ min_match)
//!                      ├─ match    → start/end from window, confidence = ratio
//!                      └─ no match → zero timing, confidence 0 (warned)
//!                ──▶ adjustment pass (overlaps, small gaps, tail)
//!                ──▶ aggregate accuracy
//!                ──▶ optional TimingStore (failure logged, not returned)
//! ```
//!
//! Alignment is pure and holds no state between calls, so one aligner can
//! serve any number of jobs in parallel.

use thiserror::Error;

use crate::config::AlignmentConfig;
use crate::script::NarrationUnit;
use crate::store::TimingStore;
use crate::stt::TranscriptSegment;

use super::accuracy::aggregate_accuracy;
use super::adjust::{adjust_timings, AdjustLimits};
use super::matcher::NormalizedSegments;
use super::timing::{AlignmentReport, UnitTiming};

// ---------------------------------------------------------------------------
// AlignError
// ---------------------------------------------------------------------------

/// Malformed alignment input.  These indicate a caller bug; units that
/// simply fail to match are reported in the result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("no narration units supplied for {0} transcript segments")]
    NoUnits(usize),

    #[error("narration unit at position {position} has index {index}; indices must run 0, 1, 2, …")]
    UnitOrder { position: usize, index: usize },

    #[error("narration unit {0} has empty text")]
    EmptyUnitText(usize),

    #[error("narration unit {index} has invalid expected duration {value}")]
    InvalidExpectedDuration { index: usize, value: f64 },

    #[error("transcript segment {index} has invalid times ({start} to {end})")]
    InvalidSegment { index: usize, start: f64, end: f64 },

    #[error("invalid total audio duration {0}")]
    InvalidAudioDuration(f64),

    #[error("invalid alignment setting: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// SegmentAligner
// ---------------------------------------------------------------------------

/// Computes per-unit timings from a timestamped transcript.
///
/// # Example
/// ```rust
/// use narration_sync::align::SegmentAligner;
/// use narration_sync::config::AlignmentConfig;
/// use narration_sync::script::units_from_texts;
/// use narration_sync::stt::TranscriptSegment;
///
/// let aligner = SegmentAligner::new(AlignmentConfig::default());
/// let units = units_from_texts(["Hello there.", "General Kenobi."]);
/// let segments = vec![
///     TranscriptSegment::new(0.0, 1.8, "Hello there."),
///     TranscriptSegment::new(2.0, 4.1, "General Kenobi."),
/// ];
///
/// let timings = aligner.align(&segments, &units, 4.5).unwrap();
/// assert_eq!(timings[0].confidence, 1.0);
/// assert_eq!(timings[0].end_time, timings[1].start_time);
/// assert_eq!(timings[1].end_time, 4.5);
/// ```
#[derive(Debug, Clone)]
pub struct SegmentAligner {
    config: AlignmentConfig,
}

impl SegmentAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// One [`UnitTiming`] per unit, in unit order.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError`] for malformed input only; unmatched units get
    /// a zero timing instead.
    pub fn align(
        &self,
        segments: &[TranscriptSegment],
        units: &[NarrationUnit],
        total_audio_duration: f64,
    ) -> Result<Vec<UnitTiming>, AlignError> {
        self.validate_config()?;
        validate_input(segments, units, total_audio_duration)?;

        let index = NormalizedSegments::new(segments);
        let mut timings: Vec<UnitTiming> = units
            .iter()
            .map(|unit| self.match_unit(&index, unit))
            .collect();

        adjust_timings(
            &mut timings,
            total_audio_duration,
            AdjustLimits {
                gap_fill_secs: self.config.gap_fill_secs,
                tail_extend_secs: self.config.tail_extend_secs,
            },
        );

        Ok(timings)
    }

    /// Aggregate accuracy of `timings` against `units`, in `[0, 100]`.
    pub fn validate(units: &[NarrationUnit], timings: &[UnitTiming]) -> f64 {
        aggregate_accuracy(units, timings)
    }

    /// [`align`](Self::align) plus accuracy and the list of unmatched units.
    pub fn align_report(
        &self,
        segments: &[TranscriptSegment],
        units: &[NarrationUnit],
        total_audio_duration: f64,
    ) -> Result<AlignmentReport, AlignError> {
        let timings = self.align(segments, units, total_audio_duration)?;
        let accuracy = Self::validate(units, &timings);
        let unmatched: Vec<usize> = timings
            .iter()
            .filter(|t| !t.is_matched())
            .map(|t| t.unit_index)
            .collect();

        log::info!(
            "align: {}/{} units matched, accuracy {accuracy:.1}",
            timings.len() - unmatched.len(),
            timings.len()
        );

        Ok(AlignmentReport {
            timings,
            accuracy,
            unmatched,
        })
    }

    /// [`align_report`](Self::align_report), then hand the timings to
    /// `store` once.
    ///
    /// A store failure is logged and does not affect the returned report.
    pub async fn align_and_store(
        &self,
        project_id: &str,
        store: Option<&dyn TimingStore>,
        segments: &[TranscriptSegment],
        units: &[NarrationUnit],
        total_audio_duration: f64,
    ) -> Result<AlignmentReport, AlignError> {
        let report = self.align_report(segments, units, total_audio_duration)?;

        if let Some(store) = store {
            if let Err(e) = store.store(project_id, &report.timings).await {
                log::warn!("align: storing timings for {project_id:?} failed: {e}");
            }
        }

        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn match_unit(&self, index: &NormalizedSegments<'_>, unit: &NarrationUnit) -> UnitTiming {
        let best = index
            .best_window(&unit.text, self.config.max_window_segments)
            .filter(|m| m.ratio >= self.config.min_match_ratio);

        match best {
            Some(window) => {
                let (start_time, end_time) = index.window_span(&window);
                log::debug!(
                    "align: unit {} → segments {}..={} ({start_time:.2}–{end_time:.2}s, ratio {:.3})",
                    unit.index,
                    window.first,
                    window.last,
                    window.ratio
                );
                UnitTiming {
                    unit_index: unit.index,
                    start_time,
                    end_time,
                    duration: end_time - start_time,
                    confidence: window.ratio,
                    matched_text: index.window_text(&window),
                }
            }
            None => {
                log::warn!(
                    "align: unit {} has no transcript window above {:.2}; using zero timing",
                    unit.index,
                    self.config.min_match_ratio
                );
                UnitTiming::unmatched(unit.index)
            }
        }
    }

    fn validate_config(&self) -> Result<(), AlignError> {
        let c = &self.config;
        if !(c.min_match_ratio > 0.0 && c.min_match_ratio <= 1.0) {
            return Err(AlignError::InvalidConfig(format!(
                "min_match_ratio must be in (0, 1], got {}",
                c.min_match_ratio
            )));
        }
        if !(c.gap_fill_secs >= 0.0 && c.tail_extend_secs >= 0.0) {
            return Err(AlignError::InvalidConfig(format!(
                "gap_fill_secs and tail_extend_secs must be non-negative, got {} and {}",
                c.gap_fill_secs, c.tail_extend_secs
            )));
        }
        if c.max_window_segments == Some(0) {
            return Err(AlignError::InvalidConfig(
                "max_window_segments must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SegmentAligner {
    fn default() -> Self {
        Self::new(AlignmentConfig::default())
    }
}

fn validate_input(
    segments: &[TranscriptSegment],
    units: &[NarrationUnit],
    total_audio_duration: f64,
) -> Result<(), AlignError> {
    if units.is_empty() && !segments.is_empty() {
        return Err(AlignError::NoUnits(segments.len()));
    }
    if !(total_audio_duration.is_finite() && total_audio_duration >= 0.0) {
        return Err(AlignError::InvalidAudioDuration(total_audio_duration));
    }
    validate_units(units)?;

    for (index, seg) in segments.iter().enumerate() {
        let valid = seg.start.is_finite() && seg.end.is_finite() && seg.start >= 0.0 && seg.end >= seg.start;
        if !valid {
            return Err(AlignError::InvalidSegment {
                index,
                start: seg.start,
                end: seg.end,
            });
        }
    }

    Ok(())
}

/// Check that `units` are numbered `0, 1, 2, …` with non-empty text and
/// sane expected durations.
pub fn validate_units(units: &[NarrationUnit]) -> Result<(), AlignError> {
    for (position, unit) in units.iter().enumerate() {
        if unit.index != position {
            return Err(AlignError::UnitOrder {
                position,
                index: unit.index,
            });
        }
        if unit.text.trim().is_empty() {
            return Err(AlignError::EmptyUnitText(unit.index));
        }
        if let Some(value) = unit.expected_duration {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AlignError::InvalidExpectedDuration {
                    index: unit.index,
                    value,
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
