//! Aggregate alignment accuracy.
//!
//! ```text
//! accuracy     = (mean(confidence) × 0.8 + duration_fit × 0.2) × 100
//! duration_fit = max(0, 1 − mean(|expected − actual| / max(expected, 0.1)))
//! ```
//!
//! `duration_fit` only looks at units whose expected duration is known and
//! is `1.0` when none is.

use crate::script::NarrationUnit;

use super::timing::UnitTiming;

const CONFIDENCE_WEIGHT: f64 = 0.8;
const DURATION_WEIGHT: f64 = 0.2;
const MIN_EXPECTED_SECS: f64 = 0.1;

/// Accuracy of `timings` against `units`, in `[0, 100]`.
///
/// Units and timings are paired positionally.  Returns `0.0` when there is
/// nothing to score.
pub fn aggregate_accuracy(units: &[NarrationUnit], timings: &[UnitTiming]) -> f64 {
    if timings.is_empty() {
        return 0.0;
    }

    let mean_confidence =
        timings.iter().map(|t| t.confidence.clamp(0.0, 1.0)).sum::<f64>() / timings.len() as f64;

    let accuracy = (mean_confidence * CONFIDENCE_WEIGHT
        + duration_fit(units, timings) * DURATION_WEIGHT)
        * 100.0;

    accuracy.clamp(0.0, 100.0)
}

/// How closely actual durations follow the caller's expectations, in `[0, 1]`.
pub fn duration_fit(units: &[NarrationUnit], timings: &[UnitTiming]) -> f64 {
    let errors: Vec<f64> = units
        .iter()
        .zip(timings)
        .filter_map(|(unit, timing)| {
            unit.expected_duration.map(|expected| {
                (expected - timing.duration).abs() / expected.max(MIN_EXPECTED_SECS)
            })
        })
        .collect();

    if errors.is_empty() {
        return 1.0;
    }

    let mean_error = errors.iter().sum::<f64>() / errors.len() as f64;
    (1.0 - mean_error).max(0.0)
}
