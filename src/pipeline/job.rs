//! Pipeline input and output documents.
//!
//! Both are plain serde types so a worker can read a job from JSON and write
//! the report back out unchanged.
//!
//! ```json
//! {
//!   "project_id": "lecture-01",
//!   "language": "ko",
//!   "units": [
//!     { "index": 0, "text": "슬라이드 1입니다", "expected_duration": 5.0 },
//!     { "index": 1, "text": "슬라이드 2입니다" }
//!   ],
//!   "tts": { "voice_id": "nova", "model": "tts-1-hd" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::align::AlignmentReport;
use crate::duration::{DurationEstimate, UnitCountRange};
use crate::script::NarrationUnit;
use crate::tts::TtsParams;
use crate::verify::VerificationResult;

// ---------------------------------------------------------------------------
// NarrationJob
// ---------------------------------------------------------------------------

/// One narration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationJob {
    /// Key the timings are stored under.
    pub project_id: String,
    /// Spoken language.  Empty means the configured default.
    #[serde(default)]
    pub language: String,
    /// Script units in order.
    pub units: Vec<NarrationUnit>,
    /// Voice/model override for this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsParams>,
}

impl NarrationJob {
    pub fn new(project_id: impl Into<String>, language: impl Into<String>, units: Vec<NarrationUnit>) -> Self {
        Self {
            project_id: project_id.into(),
            language: language.into(),
            units,
            tts: None,
        }
    }

    pub fn with_tts(mut self, tts: TtsParams) -> Self {
        self.tts = Some(tts);
        self
    }
}

// ---------------------------------------------------------------------------
// UnitEstimate
// ---------------------------------------------------------------------------

/// Pacing feedback for one unit, computed before any audio exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitEstimate {
    pub unit_index: usize,
    pub estimate: DurationEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_duration: Option<f64>,
    /// How much text would fill `expected_duration`, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_units: Option<UnitCountRange>,
}

impl UnitEstimate {
    /// `predicted / expected`, when an expected duration above zero is known.
    pub fn pacing_ratio(&self) -> Option<f64> {
        self.expected_duration
            .filter(|e| *e > 0.0)
            .map(|e| self.estimate.predicted_duration / e)
    }
}

// ---------------------------------------------------------------------------
// NarrationReport
// ---------------------------------------------------------------------------

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationReport {
    pub project_id: String,
    /// Language the job ran under, after tag normalization.
    pub language: String,
    pub estimates: Vec<UnitEstimate>,
    /// Estimate for the full script sent to the synthesizer.
    pub script_estimate: DurationEstimate,
    pub verification: VerificationResult,
    /// `None` when there was no audio worth aligning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentReport>,
    /// Why alignment was attempted but rejected the transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment_error: Option<String>,
}

impl NarrationReport {
    /// Final audio bytes, if any attempt produced usable audio.
    pub fn audio(&self) -> Option<&[u8]> {
        self.verification.audio.as_ref().map(|a| a.bytes.as_slice())
    }
}
