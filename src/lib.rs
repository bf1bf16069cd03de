//! Narration synchronization engine.
//!
//! Given a script split into ordered narration units, the engine predicts
//! how long each unit takes to speak, synthesizes the full script, verifies
//! the audio by transcribing it back, retries until the transcript matches,
//! and finally maps transcript timestamps back onto the units.
//!
//! ```text
//! units ─▶ duration ─▶ verify (tts ⇄ stt) ─▶ align ─▶ store
//! ```

pub mod align;
pub mod config;
pub mod duration;
pub mod pipeline;
pub mod script;
pub mod store;
pub mod stt;
pub mod text;
pub mod tts;
pub mod verify;
