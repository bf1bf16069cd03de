//! Verification loop state machine.

// ---------------------------------------------------------------------------
// VerifyState
// ---------------------------------------------------------------------------

/// States of the synthesize → transcribe → score loop.
///
/// ```text
/// Generate ──TTS ok──▶ Transcribe ──STT ok──▶ Score
///                                               ├─ score ≥ threshold ─────▶ Accept
///                                               ├─ attempts exhausted ────▶ Fail
///                                               └─ otherwise ─────────────▶ Retry
/// Retry ──attempt += 1──▶ Generate
///
/// Generate / Transcribe ──fault──▶ Retry   (retry_on_fault, attempts left)
///                       ──fault──▶ Fail    (otherwise)
/// Generate / Transcribe ──cancelled──▶ Fail
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyState {
    /// Synthesizing audio for the current attempt.
    #[default]
    Generate,

    /// Transcribing the audio produced by `Generate`.
    Transcribe,

    /// Comparing the transcript with the script.
    Score,

    /// The transcript matched well enough.  Terminal.
    Accept,

    /// Starting the next attempt.
    Retry,

    /// Attempts exhausted, a fault ended the loop, or the job was
    /// cancelled.  Terminal.
    Fail,
}

impl VerifyState {
    /// ```
    /// use narration_sync::verify::VerifyState;
    ///
    /// assert!(VerifyState::Accept.is_terminal());
    /// assert!(VerifyState::Fail.is_terminal());
    /// assert!(!VerifyState::Retry.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerifyState::Accept | VerifyState::Fail)
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            VerifyState::Generate => "generate",
            VerifyState::Transcribe => "transcribe",
            VerifyState::Score => "score",
            VerifyState::Accept => "accept",
            VerifyState::Retry => "retry",
            VerifyState::Fail => "fail",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
