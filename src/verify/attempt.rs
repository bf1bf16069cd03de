//! Verification inputs, per-attempt records and the final result.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::{TtsConfig, VerificationConfig};
use crate::stt::TranscriptSegment;
use crate::tts::TtsParams;

// ---------------------------------------------------------------------------
// VerifyOptions
// ---------------------------------------------------------------------------

/// Per-run options for [`NarrationVerificationLoop::run`](super::NarrationVerificationLoop::run).
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    /// Upper bound on synthesize/transcribe attempts.  Must be ≥ 1.
    pub max_attempts: u32,
    /// Minimum normalized similarity to accept, in `[0, 1]`.
    pub accuracy_threshold: f64,
    pub tts: TtsParams,
    /// Language passed to the transcriber.
    pub language: String,
}

impl VerifyOptions {
    pub fn from_config(verification: &VerificationConfig, tts: &TtsConfig, language: &str) -> Self {
        Self {
            max_attempts: verification.max_attempts,
            accuracy_threshold: verification.accuracy_threshold,
            tts: TtsParams::from_config(tts),
            language: language.to_string(),
        }
    }
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default(), &TtsConfig::default(), "auto")
    }
}

// ---------------------------------------------------------------------------
// SynthesizedAudio / VerificationAttempt
// ---------------------------------------------------------------------------

/// Audio produced by one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// 1-based attempt that produced the audio.
    pub attempt_number: u32,
}

/// One scored synthesize/transcribe round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationAttempt {
    pub attempt_number: u32,
    #[serde(skip)]
    pub audio: SynthesizedAudio,
    pub transcript_text: String,
    #[serde(skip)]
    pub transcript_segments: Vec<TranscriptSegment>,
    /// Duration reported by the transcriber, in seconds.
    pub audio_duration: f64,
    pub similarity_score: f64,
    /// Milliseconds since the Unix epoch when scoring finished.
    pub timestamp_ms: u64,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// VerificationOutcome / VerificationResult
// ---------------------------------------------------------------------------

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// An attempt reached the threshold.
    Accepted,
    /// Every attempt was scored and none reached the threshold.
    ThresholdMiss,
    /// A provider call failed and ended the loop.
    HardFault { error: String },
    /// The cancellation token tripped.
    Cancelled { reason: String },
}

/// Result of one verification run.
///
/// `audio`, `transcript_*`, `audio_duration` and `similarity_score` describe
/// the accepted attempt, or the best-scoring attempt when none was accepted.
/// They are empty when no attempt got as far as scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub outcome: VerificationOutcome,
    /// Always ≤ `max_attempts`.
    pub attempts_used: u32,
    #[serde(skip)]
    pub audio: Option<SynthesizedAudio>,
    pub transcript_text: String,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub audio_duration: f64,
    pub similarity_score: f64,
    /// Every scored attempt, in order.
    pub attempts: Vec<VerificationAttempt>,
}

impl VerificationResult {
    pub fn success(&self) -> bool {
        self.outcome == VerificationOutcome::Accepted
    }

    /// Error text for faults and cancellations; `None` on success and on a
    /// plain threshold miss.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            VerificationOutcome::HardFault { error } => Some(error),
            VerificationOutcome::Cancelled { reason } => Some(reason),
            VerificationOutcome::Accepted | VerificationOutcome::ThresholdMiss => None,
        }
    }

    /// The attempt whose data the result carries, if any.
    pub fn best_attempt(&self) -> Option<&VerificationAttempt> {
        let number = self.audio.as_ref()?.attempt_number;
        self.attempts.iter().find(|a| a.attempt_number == number)
    }

    /// Build a result from the attempts scored so far.
    pub(crate) fn from_attempts(
        outcome: VerificationOutcome,
        attempts_used: u32,
        attempts: Vec<VerificationAttempt>,
    ) -> Self {
        // Latest attempt when accepted, otherwise the best score (earliest on ties).
        let chosen = if outcome == VerificationOutcome::Accepted {
            attempts.last()
        } else {
            attempts.iter().fold(None, |best: Option<&VerificationAttempt>, a| match best {
                Some(b) if b.similarity_score >= a.similarity_score => Some(b),
                _ => Some(a),
            })
        };

        match chosen.cloned() {
            Some(a) => Self {
                outcome,
                attempts_used,
                audio: Some(a.audio),
                transcript_text: a.transcript_text,
                transcript_segments: a.transcript_segments,
                audio_duration: a.audio_duration,
                similarity_score: a.similarity_score,
                attempts,
            },
            None => Self {
                outcome,
                attempts_used,
                audio: None,
                transcript_text: String::new(),
                transcript_segments: Vec::new(),
                audio_duration: 0.0,
                similarity_score: 0.0,
                attempts,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
