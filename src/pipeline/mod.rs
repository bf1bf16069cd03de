//! Job-level orchestration for narration workers.
//!
//! # Architecture
//!
//! ```text
//! NarrationJob (JSON)
//!        │
//!        ▼
//! NarrationPipeline::run()
//!        │
//!        ├─ EstimatorRegistry      → per-unit estimates, pacing feedback
//!        ├─ NarrationVerificationLoop
//!        │     ├─ Synthesizer      (TTS provider)
//!        │     └─ Transcriber      (STT provider)
//!        └─ SegmentAligner
//!              └─ TimingStore      (optional)
//!        │
//!        ▼
//! NarrationReport (JSON)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use narration_sync::config::AppConfig;
//! use narration_sync::duration::EstimatorRegistry;
//! use narration_sync::pipeline::{NarrationJob, NarrationPipeline};
//! use narration_sync::script::units_from_texts;
//! use narration_sync::stt::ApiTranscriber;
//! use narration_sync::tts::ApiSynthesizer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let registry = Arc::new(EstimatorRegistry::new(config.estimator.clone()));
//!     let pipeline = NarrationPipeline::new(
//!         config.clone(),
//!         registry,
//!         Arc::new(ApiSynthesizer::from_config(&config.tts)),
//!         Arc::new(ApiTranscriber::from_config(&config.stt)),
//!     );
//!
//!     let job = NarrationJob::new("demo", "en", units_from_texts(["Hello.", "Goodbye."]));
//!     let report = pipeline.run(&job, &pipeline.cancellation_token()).await.unwrap();
//!     println!("{}", report.verification.success());
//! }
//! ```

pub mod job;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use job::{NarrationJob, NarrationReport, UnitEstimate};
pub use runner::{NarrationPipeline, PipelineError};
