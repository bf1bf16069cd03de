//! STT (Speech-to-Text) collaborator module.
//!
//! The verification loop transcribes every synthesized clip back to text to
//! check that the audio says what the script says.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │              Transcriber (trait)               │
//! │                                                │
//! │   audio bytes ──▶ ApiTranscriber ──▶ Transcript│
//! │                   (verbose_json)   - text      │
//! │                                    - segments  │
//! │                                    - duration  │
//! └────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{ApiTranscriber, Transcriber, TranscriptionError};
pub use transcribe::{Transcript, TranscriptSegment};

// test-only re-export so the loop and pipeline tests can script responses.
#[cfg(test)]
pub use engine::{transcript_of, ScriptedTranscriber};
