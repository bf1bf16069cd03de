//! Narration verification: synthesize a script, transcribe it back, and
//! retry until the transcript matches.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────── NarrationVerificationLoop ────────────────┐
//!  text ───▶ │ Generate ─▶ Transcribe ─▶ Score ─▶ Accept / Retry / Fail  │ ───▶ VerificationResult
//!            │    │             │                    │                  │        - outcome
//!            │    ▼             ▼                    ▼                  │        - best/accepted audio
//!            │ Synthesizer  Transcriber      DurationEstimator          │        - transcript segments
//!            │                              (record_observation)        │
//!            └───────────────────────────────────────────────────────────┘
//!  CancellationToken checked before every provider call
//! ```

pub mod attempt;
pub mod cancel;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use attempt::{
    SynthesizedAudio, VerificationAttempt, VerificationOutcome, VerificationResult, VerifyOptions,
};
pub use cancel::CancellationToken;
pub use runner::{NarrationVerificationLoop, VerifyError};
pub use state::VerifyState;
