//! Spoken-duration prediction with a learned correction factor.
//!
//! ```text
//! base      = unit_count / units_per_minute × 60
//! pause     = Σ pause_table[c]  for every c in text
//! predicted = (base + pause) × correction_factor
//! ```
//!
//! The correction factor starts at `1.0` and follows an exponential moving
//! average of observed `actual / predicted` ratios.  It is the only mutable
//! state in the estimator and lives behind a `Mutex`, so one estimator can
//! be shared by every job narrating in the same language.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::language::LanguageProfile;

// ---------------------------------------------------------------------------
// DurationEstimate
// ---------------------------------------------------------------------------

/// Predicted spoken duration of a piece of text, with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimate {
    /// Final prediction in seconds (`(base + pause) × correction`).
    pub predicted_duration: f64,
    /// Seconds spent reading the units at the language's speed.
    pub base_reading_duration: f64,
    /// Seconds of punctuation and line-break pauses.
    pub pause_duration: f64,
    /// Words or characters counted, depending on the language.
    pub unit_count: usize,
    /// Correction factor in effect when the estimate was made.
    pub correction_factor: f64,
}

impl DurationEstimate {
    fn zero(correction_factor: f64) -> Self {
        Self {
            predicted_duration: 0.0,
            base_reading_duration: 0.0,
            pause_duration: 0.0,
            unit_count: 0,
            correction_factor,
        }
    }

    /// The prediction before the correction factor is applied.
    ///
    /// This is the value observations are recorded against, so that the
    /// factor converges on the true `actual / model` ratio.
    pub fn uncorrected_duration(&self) -> f64 {
        self.base_reading_duration + self.pause_duration
    }
}

// ---------------------------------------------------------------------------
// UnitCountRange
// ---------------------------------------------------------------------------

/// How much text to write to hit a target duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCountRange {
    pub min: usize,
    pub max: usize,
    pub target: usize,
}

// ---------------------------------------------------------------------------
// DurationEstimator
// ---------------------------------------------------------------------------

/// Duration model for a single language.
///
/// # Example
/// ```rust
/// use narration_sync::duration::DurationEstimator;
///
/// let estimator = DurationEstimator::for_language("en");
/// let estimate = estimator.calculate("Welcome to the course.");
/// assert_eq!(estimate.unit_count, 4);
/// assert!(estimate.predicted_duration > 0.0);
///
/// assert_eq!(estimator.calculate("").predicted_duration, 0.0);
/// ```
#[derive(Debug)]
pub struct DurationEstimator {
    profile: LanguageProfile,
    correction: Mutex<f64>,
}

impl DurationEstimator {
    /// Weight of a new observation in the moving average.
    pub const SMOOTHING: f64 = 0.1;

    /// Default tolerance band for [`estimate_unit_count_for_duration`].
    ///
    /// [`estimate_unit_count_for_duration`]: Self::estimate_unit_count_for_duration
    pub const DEFAULT_MARGIN: f64 = 0.10;

    pub fn new(profile: LanguageProfile) -> Self {
        Self {
            profile,
            correction: Mutex::new(1.0),
        }
    }

    /// Estimator with the built-in profile for `language`.
    pub fn for_language(language: &str) -> Self {
        Self::new(LanguageProfile::builtin(language))
    }

    pub fn language(&self) -> &str {
        &self.profile.language
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    /// Current learned correction factor.
    pub fn correction_factor(&self) -> f64 {
        *self.correction.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Predict how long `text` takes to narrate.
    ///
    /// Empty or whitespace-only text yields a zero estimate rather than an
    /// error.
    pub fn calculate(&self, text: &str) -> DurationEstimate {
        let correction_factor = self.correction_factor();
        if text.trim().is_empty() {
            return DurationEstimate::zero(correction_factor);
        }

        let unit_count = self.profile.unit_kind.count(text);
        let base_reading_duration = unit_count as f64 / self.profile.units_per_minute * 60.0;
        let pause_duration = self.profile.pauses.total(text);

        DurationEstimate {
            predicted_duration: (base_reading_duration + pause_duration) * correction_factor,
            base_reading_duration,
            pause_duration,
            unit_count,
            correction_factor,
        }
    }

    /// Inverse of [`calculate`](Self::calculate): how many units of text
    /// produce `target_duration` seconds of narration, within `±margin`.
    ///
    /// Pauses are unknown for text that has not been written yet, so the
    /// inversion assumes none; a writer aiming for the lower half of the
    /// band leaves room for punctuation.
    pub fn estimate_unit_count_for_duration(
        &self,
        target_duration: f64,
        margin: f64,
    ) -> UnitCountRange {
        if !(target_duration.is_finite() && target_duration > 0.0) {
            return UnitCountRange {
                min: 0,
                max: 0,
                target: 0,
            };
        }
        let margin = if margin.is_finite() {
            margin.clamp(0.0, 1.0)
        } else {
            Self::DEFAULT_MARGIN
        };

        let units = target_duration / self.correction_factor() / 60.0 * self.profile.units_per_minute;

        UnitCountRange {
            min: (units * (1.0 - margin)).floor() as usize,
            max: (units * (1.0 + margin)).ceil() as usize,
            target: units.round() as usize,
        }
    }

    /// Feed back a measured duration.
    ///
    /// `new = 0.9 × old + 0.1 × (actual / predicted)`.  Ignored when either
    /// value is non-positive or not finite.
    pub fn record_observation(&self, predicted: f64, actual: f64) {
        if !(predicted.is_finite() && actual.is_finite()) || predicted <= 0.0 || actual <= 0.0 {
            log::debug!(
                "estimator[{}]: ignoring observation predicted={predicted} actual={actual}",
                self.profile.language
            );
            return;
        }

        let ratio = actual / predicted;
        let mut factor = self.correction.lock().unwrap_or_else(PoisonError::into_inner);
        *factor = (1.0 - Self::SMOOTHING) * *factor + Self::SMOOTHING * ratio;

        log::debug!(
            "estimator[{}]: observed ratio {ratio:.3}, correction factor now {:.3}",
            self.profile.language,
            *factor
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
