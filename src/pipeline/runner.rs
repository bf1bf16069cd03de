//! Narration pipeline: drives one job from script units to stored timings.
//!
//! # Pipeline flow
//!
//! ```text
//! NarrationJob
//!   └─▶ validate units
//!   └─▶ EstimatorRegistry::get(language)
//!         └─▶ per-unit DurationEstimate + pacing warnings
//!   └─▶ full_script(units) ─▶ NarrationVerificationLoop::run
//!         ├─ Accepted                      → align
//!         ├─ ThresholdMiss + best effort   → align the best attempt
//!         └─ otherwise                     → no alignment
//!   └─▶ SegmentAligner::align_and_store ─▶ TimingStore (optional)
//!   └─▶ NarrationReport
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::align::{validate_units, AlignError, SegmentAligner};
use crate::config::AppConfig;
use crate::duration::{DurationEstimator, EstimatorRegistry};
use crate::script::{full_script, NarrationUnit};
use crate::store::TimingStore;
use crate::stt::Transcriber;
use crate::tts::{Synthesizer, TtsParams};
use crate::verify::{
    CancellationToken, NarrationVerificationLoop, VerificationOutcome, VerifyError, VerifyOptions,
};

use super::job::{NarrationJob, NarrationReport, UnitEstimate};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Malformed jobs.  Provider trouble shows up in the report instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("job {0:?} has no narration units")]
    NoUnits(String),

    #[error("job has an empty project id")]
    EmptyProjectId,

    #[error("invalid narration units: {0}")]
    Units(#[source] AlignError),

    #[error("verification input rejected: {0}")]
    Verify(#[from] VerifyError),
}

// ---------------------------------------------------------------------------
// NarrationPipeline
// ---------------------------------------------------------------------------

/// Composes estimation, verification and alignment for whole jobs.
///
/// One pipeline serves any number of concurrent jobs; the only state they
/// share is the per-language correction factor inside the registry.
pub struct NarrationPipeline {
    config: AppConfig,
    registry: Arc<EstimatorRegistry>,
    synthesizer: Arc<dyn Synthesizer>,
    transcriber: Arc<dyn Transcriber>,
    store: Option<Arc<dyn TimingStore>>,
    aligner: SegmentAligner,
}

impl NarrationPipeline {
    /// Predicted durations further than this from the expected duration are
    /// logged as pacing warnings.
    pub const PACING_TOLERANCE: f64 = DurationEstimator::DEFAULT_MARGIN;

    pub fn new(
        config: AppConfig,
        registry: Arc<EstimatorRegistry>,
        synthesizer: Arc<dyn Synthesizer>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let aligner = SegmentAligner::new(config.alignment.clone());
        Self {
            config,
            registry,
            synthesizer,
            transcriber,
            store: None,
            aligner,
        }
    }

    /// Persist timings of every aligned job to `store`.
    pub fn with_store(mut self, store: Arc<dyn TimingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(&self) -> &Arc<EstimatorRegistry> {
        &self.registry
    }

    /// A token carrying the configured job deadline, if any.
    pub fn cancellation_token(&self) -> CancellationToken {
        match self.config.verification.job_timeout_secs {
            Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
            None => CancellationToken::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Main entry point
    // -----------------------------------------------------------------------

    /// Run `job` to completion.
    ///
    /// # Errors
    ///
    /// [`PipelineError`] when the job itself is malformed.  Threshold
    /// misses, provider faults and cancellation are reported through
    /// [`NarrationReport::verification`]; a transcript the aligner rejects
    /// through [`NarrationReport::alignment_error`].
    pub async fn run(
        &self,
        job: &NarrationJob,
        cancel: &CancellationToken,
    ) -> Result<NarrationReport, PipelineError> {
        validate_job(job)?;

        let estimator = self.registry.get(&job.language);
        let language = estimator.language().to_string();

        let estimates = self.estimate_units(&estimator, &job.units);
        let script = full_script(&job.units);
        let script_estimate = estimator.calculate(&script);

        log::info!(
            "pipeline[{}]: {} units, {language}, ~{:.1}s predicted (correction {:.3})",
            job.project_id,
            job.units.len(),
            script_estimate.predicted_duration,
            script_estimate.correction_factor
        );

        // ── Verification ───────────────────────────────────────────────────
        let options = VerifyOptions {
            max_attempts: self.config.verification.max_attempts,
            accuracy_threshold: self.config.verification.accuracy_threshold,
            tts: job
                .tts
                .clone()
                .unwrap_or_else(|| TtsParams::from_config(&self.config.tts)),
            language: language.clone(),
        };
        let verifier = NarrationVerificationLoop::from_config(
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.transcriber),
            &self.config.verification,
        )
        .with_estimator(Arc::clone(&estimator));

        let verification = verifier.run(&script, &options, cancel).await?;

        // ── Alignment ──────────────────────────────────────────────────────
        let align = match &verification.outcome {
            VerificationOutcome::Accepted => true,
            VerificationOutcome::ThresholdMiss => {
                let usable = self.config.verification.accept_best_effort && verification.audio.is_some();
                if usable {
                    log::warn!(
                        "pipeline[{}]: aligning best-effort audio (similarity {:.3})",
                        job.project_id,
                        verification.similarity_score
                    );
                }
                usable
            }
            VerificationOutcome::HardFault { .. } | VerificationOutcome::Cancelled { .. } => false,
        };

        let mut alignment_error = None;
        let alignment = if align {
            let aligned = self
                .aligner
                .align_and_store(
                    &job.project_id,
                    self.store.as_deref(),
                    &verification.transcript_segments,
                    &job.units,
                    verification.audio_duration,
                )
                .await;
            match aligned {
                Ok(report) => Some(report),
                Err(e) => {
                    log::error!("pipeline[{}]: alignment rejected: {e}", job.project_id);
                    alignment_error = Some(e.to_string());
                    None
                }
            }
        } else {
            log::warn!(
                "pipeline[{}]: no usable audio, skipping alignment",
                job.project_id
            );
            None
        };

        Ok(NarrationReport {
            project_id: job.project_id.clone(),
            language,
            estimates,
            script_estimate,
            verification,
            alignment,
            alignment_error,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn estimate_units(&self, estimator: &DurationEstimator, units: &[NarrationUnit]) -> Vec<UnitEstimate> {
        units
            .iter()
            .map(|unit| {
                let estimate = estimator.calculate(&unit.text);
                let suggested_units = unit.expected_duration.map(|expected| {
                    estimator.estimate_unit_count_for_duration(expected, DurationEstimator::DEFAULT_MARGIN)
                });
                let unit_estimate = UnitEstimate {
                    unit_index: unit.index,
                    estimate,
                    expected_duration: unit.expected_duration,
                    suggested_units,
                };

                if let (Some(ratio), Some(range)) = (unit_estimate.pacing_ratio(), suggested_units) {
                    if (ratio - 1.0).abs() > Self::PACING_TOLERANCE {
                        log::warn!(
                            "pipeline: unit {} predicted {:.1}s vs expected {:.1}s; aim for {}..={} {:?} (currently {})",
                            unit.index,
                            unit_estimate.estimate.predicted_duration,
                            unit.expected_duration.unwrap_or_default(),
                            range.min,
                            range.max,
                            estimator.profile().unit_kind,
                            unit_estimate.estimate.unit_count
                        );
                    }
                } else {
                    log::debug!(
                        "pipeline: unit {} predicted {:.1}s",
                        unit.index,
                        unit_estimate.estimate.predicted_duration
                    );
                }

                unit_estimate
            })
            .collect()
    }
}

fn validate_job(job: &NarrationJob) -> Result<(), PipelineError> {
    if job.project_id.trim().is_empty() {
        return Err(PipelineError::EmptyProjectId);
    }
    if job.units.is_empty() {
        return Err(PipelineError::NoUnits(job.project_id.clone()));
    }
    validate_units(&job.units).map_err(PipelineError::Units)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EstimatorConfig, VerificationConfig};
    use crate::script::units_from_texts;
    use crate::store::MemoryTimingStore;
    use crate::stt::{ScriptedTranscriber, Transcript, TranscriptSegment, TranscriptionError};
    use crate::tts::ScriptedSynthesizer;

    fn slides_job() -> NarrationJob {
        let units = units_from_texts(["슬라이드 1입니다", "슬라이드 2입니다", "슬라이드 3입니다"])
            .into_iter()
            .map(|u| u.with_expected_duration(5.0))
            .collect();
        NarrationJob::new("lecture-01", "ko-KR", units)
    }

    fn slides_transcript() -> Transcript {
        Transcript {
            text: "슬라이드 1입니다. 슬라이드 2입니다. 슬라이드 3입니다.".into(),
            segments: vec![
                TranscriptSegment::new(0.0, 6.0, "슬라이드 1입니다."),
                TranscriptSegment::new(4.5, 12.0, "슬라이드 2입니다."),
                TranscriptSegment::new(12.0, 15.0, "슬라이드 3입니다."),
            ],
            duration: 15.0,
        }
    }

    fn pipeline(
        config: AppConfig,
        tts: Arc<ScriptedSynthesizer>,
        stt: Arc<ScriptedTranscriber>,
    ) -> NarrationPipeline {
        let registry = Arc::new(EstimatorRegistry::new(config.estimator.clone()));
        NarrationPipeline::new(config, registry, tts, stt)
    }

    #[tokio::test]
    async fn accepted_job_is_aligned_and_stored() {
        let store = Arc::new(MemoryTimingStore::new());
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(slides_transcript())]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt)
            .with_store(store.clone());

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert!(report.verification.success());
        assert_eq!(report.language, "ko");
        assert_eq!(report.estimates.len(), 3);
        assert!(report.audio().is_some());

        let alignment = report.alignment.unwrap();
        let t = &alignment.timings;
        assert!(t[0].end_time <= t[1].start_time);
        assert!(t[1].end_time <= t[2].start_time);
        assert_eq!(t[2].end_time, 15.0);

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "lecture-01");
        assert_eq!(saved[0].1, alignment.timings);
    }

    #[tokio::test]
    async fn accepted_job_calibrates_language_estimator() {
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(slides_transcript())]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt);

        p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert_ne!(p.registry().get("ko").correction_factor(), 1.0);
        assert_eq!(p.registry().get("en").correction_factor(), 1.0);
    }

    #[tokio::test]
    async fn script_is_units_joined_by_newline() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(slides_transcript())]));
        let p = pipeline(AppConfig::default(), tts.clone(), stt);

        p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert_eq!(
            tts.texts(),
            vec!["슬라이드 1입니다\n슬라이드 2입니다\n슬라이드 3입니다"]
        );
    }

    #[tokio::test]
    async fn best_effort_audio_is_aligned_on_threshold_miss() {
        let mut transcript = slides_transcript();
        transcript.text = "슬라이드 1입니다. 슬라이드 2입니다.".into();
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(transcript)]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt);

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.verification.outcome, VerificationOutcome::ThresholdMiss);
        assert_eq!(report.verification.attempts_used, 5);
        assert!(report.alignment.is_some());
    }

    #[tokio::test]
    async fn threshold_miss_without_best_effort_skips_alignment() {
        let config = AppConfig {
            verification: VerificationConfig {
                accept_best_effort: false,
                max_attempts: 2,
                ..VerificationConfig::default()
            },
            ..AppConfig::default()
        };
        let store = Arc::new(MemoryTimingStore::new());
        let stt = Arc::new(ScriptedTranscriber::always("전혀 다른 내용", 3.0));
        let p = pipeline(config, Arc::new(ScriptedSynthesizer::ok()), stt).with_store(store.clone());

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert!(report.alignment.is_none());
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn hard_fault_is_reported_not_returned() {
        let stt = Arc::new(ScriptedTranscriber::new(vec![Err(TranscriptionError::RateLimited)]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt);

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        assert!(matches!(
            report.verification.outcome,
            VerificationOutcome::HardFault { .. }
        ));
        assert!(report.alignment.is_none());
        assert!(report.audio().is_none());
    }

    #[tokio::test]
    async fn cancelled_job_stops_before_synthesis() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always("x", 1.0));
        let p = pipeline(AppConfig::default(), tts.clone(), stt);
        let cancel = p.cancellation_token();
        cancel.cancel();

        let report = p.run(&slides_job(), &cancel).await.unwrap();

        assert!(matches!(
            report.verification.outcome,
            VerificationOutcome::Cancelled { .. }
        ));
        assert_eq!(tts.calls(), 0);
    }

    #[tokio::test]
    async fn empty_language_uses_default() {
        let config = AppConfig {
            estimator: EstimatorConfig {
                default_language: "en".into(),
                ..EstimatorConfig::default()
            },
            ..AppConfig::default()
        };
        let job = NarrationJob::new("p", "", units_from_texts(["Hello there."]));
        let stt = Arc::new(ScriptedTranscriber::always("hello there", 1.0));
        let p = pipeline(config, Arc::new(ScriptedSynthesizer::ok()), stt);

        let report = p.run(&job, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.language, "en");
    }

    #[tokio::test]
    async fn expected_durations_produce_suggestions() {
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(slides_transcript())]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt);

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();

        let e = &report.estimates[0];
        let range = e.suggested_units.unwrap();
        assert!(range.min <= range.target && range.target <= range.max);
        assert!(e.pacing_ratio().is_some());
    }

    #[tokio::test]
    async fn malformed_jobs_are_rejected() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always("x", 1.0));
        let p = pipeline(AppConfig::default(), tts.clone(), stt);
        let cancel = CancellationToken::new();

        let empty = NarrationJob::new("p", "ko", Vec::new());
        assert_eq!(
            p.run(&empty, &cancel).await.unwrap_err(),
            PipelineError::NoUnits("p".into())
        );

        let no_id = NarrationJob::new(" ", "ko", units_from_texts(["a"]));
        assert_eq!(p.run(&no_id, &cancel).await.unwrap_err(), PipelineError::EmptyProjectId);

        let blank = NarrationJob::new("p", "ko", units_from_texts(["a", ""]));
        assert_eq!(
            p.run(&blank, &cancel).await.unwrap_err(),
            PipelineError::Units(AlignError::EmptyUnitText(1))
        );

        assert_eq!(tts.calls(), 0);
    }

    #[tokio::test]
    async fn bad_transcript_keeps_verified_audio() {
        let mut transcript = slides_transcript();
        transcript.segments[1].end = 1.0;
        let stt = Arc::new(ScriptedTranscriber::new(vec![Ok(transcript)]));
        let p = pipeline(AppConfig::default(), Arc::new(ScriptedSynthesizer::ok()), stt);

        let report = p.run(&slides_job(), &CancellationToken::new()).await.unwrap();
        assert!(report.verification.success());
        assert!(report.audio().is_some());
        assert!(report.alignment.is_none());
        let err = report.alignment_error.unwrap();
        assert!(err.contains("segment 1"), "{err}");
    }

    #[test]
    fn configured_deadline_is_applied() {
        let config = AppConfig {
            verification: VerificationConfig {
                job_timeout_secs: Some(60),
                ..VerificationConfig::default()
            },
            ..AppConfig::default()
        };
        let stt = Arc::new(ScriptedTranscriber::always("x", 1.0));
        let p = pipeline(config, Arc::new(ScriptedSynthesizer::ok()), stt);
        assert!(p.cancellation_token().deadline().is_some());
        assert!(!p.cancellation_token().is_cancelled());
    }
}
