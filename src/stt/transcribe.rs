//! Transcription result types.
//!
//! [`Transcript`] is what every [`Transcriber`](crate::stt::Transcriber)
//! returns.  Its shape follows the OpenAI `verbose_json` transcription
//! response, so [`ApiTranscriber`](crate::stt::ApiTranscriber) can
//! deserialize provider output directly; unknown fields are ignored.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TranscriptSegment
// ---------------------------------------------------------------------------

/// A single time-aligned text chunk produced by the transcriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start in seconds from the start of the audio.
    pub start: f64,
    /// Segment end in seconds from the start of the audio.
    pub end: f64,
    /// Segment text (may include punctuation inserted by the model).
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// The output of a successful transcription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Full transcript text.
    pub text: String,

    /// Individual time-aligned segments.
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,

    /// Length of the transcribed audio in seconds, as reported by the
    /// provider.  `0.0` when the provider does not report it.
    #[serde(default)]
    pub duration: f64,
}

impl Transcript {
    /// Audio length in seconds: the reported duration, or the end of the
    /// last segment when no duration was reported.
    pub fn audio_duration(&self) -> f64 {
        if self.duration > 0.0 {
            return self.duration;
        }
        self.segments
            .iter()
            .map(|s| s.end)
            .fold(0.0, f64::max)
    }
}
