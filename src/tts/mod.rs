//! TTS (Text-to-Speech) collaborator module.
//!
//! This module provides:
//! * [`Synthesizer`]: async trait implemented by all synthesis backends.
//! * [`ApiSynthesizer`]: OpenAI-compatible REST API synthesizer.
//! * [`TtsParams`]: voice / model selection for one request.
//! * [`SynthesisError`]: error variants for synthesis calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use narration_sync::config::AppConfig;
//! use narration_sync::tts::{ApiSynthesizer, Synthesizer, TtsParams};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let tts = ApiSynthesizer::from_config(&config.tts);
//!     let audio = tts
//!         .synthesize("슬라이드 1입니다.", &TtsParams::from_config(&config.tts))
//!         .await
//!         .unwrap();
//!     println!("{} bytes", audio.len());
//! }
//! ```

pub mod synthesizer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use synthesizer::{ApiSynthesizer, SynthesisError, Synthesizer, TtsParams};

#[cfg(test)]
pub use synthesizer::ScriptedSynthesizer;
