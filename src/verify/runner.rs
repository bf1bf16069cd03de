//! Narration verification loop: synthesize, transcribe back, score, retry.
//!
//! [`NarrationVerificationLoop`] owns the two provider collaborators and
//! drives [`VerifyState`] until it reaches a terminal state.
//!
//! # Flow
//!
//! ```text
//! attempt 1..=max_attempts
//!   Generate    checkpoint → Synthesizer::synthesize   (provider timeout)
//!   Transcribe  checkpoint → Transcriber::transcribe   (provider timeout)
//!   Score       normalized_similarity(script, transcript)
//!                 ├─ ≥ threshold → Accept → record_observation on the estimator
//!                 ├─ last attempt → Fail (ThresholdMiss, best attempt reported)
//!                 └─ otherwise   → Retry
//! ```
//!
//! Attempts run strictly one after another.  A provider fault consumes the
//! attempt it happened in.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::VerificationConfig;
use crate::duration::DurationEstimator;
use crate::stt::{Transcriber, Transcript, TranscriptionError};
use crate::text::normalized_similarity;
use crate::tts::{SynthesisError, Synthesizer, TtsParams};

use super::attempt::{
    now_ms, SynthesizedAudio, VerificationAttempt, VerificationOutcome, VerificationResult,
    VerifyOptions,
};
use super::cancel::CancellationToken;
use super::state::VerifyState;

// ---------------------------------------------------------------------------
// VerifyError
// ---------------------------------------------------------------------------

/// Malformed verification input.  Provider faults and threshold misses are
/// reported through [`VerificationOutcome`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("narration text is empty")]
    EmptyText,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("accuracy threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}

// ---------------------------------------------------------------------------
// NarrationVerificationLoop
// ---------------------------------------------------------------------------

/// Produces narration audio whose transcript matches the script.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use narration_sync::config::AppConfig;
/// use narration_sync::stt::ApiTranscriber;
/// use narration_sync::tts::ApiSynthesizer;
/// use narration_sync::verify::{CancellationToken, NarrationVerificationLoop, VerifyOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::default();
/// let verifier = NarrationVerificationLoop::from_config(
///     Arc::new(ApiSynthesizer::from_config(&config.tts)),
///     Arc::new(ApiTranscriber::from_config(&config.stt)),
///     &config.verification,
/// );
///
/// let options = VerifyOptions::from_config(&config.verification, &config.tts, "ko");
/// let result = verifier
///     .run("안녕하세요. 오늘은 소유권을 배웁니다.", &options, &CancellationToken::new())
///     .await?;
/// println!("accepted: {} after {} attempts", result.success(), result.attempts_used);
/// # Ok(())
/// # }
/// ```
pub struct NarrationVerificationLoop {
    synthesizer: Arc<dyn Synthesizer>,
    transcriber: Arc<dyn Transcriber>,
    estimator: Option<Arc<DurationEstimator>>,
    retry_on_fault: bool,
    provider_timeout: Duration,
}

impl NarrationVerificationLoop {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self::from_config(synthesizer, transcriber, &VerificationConfig::default())
    }

    pub fn from_config(
        synthesizer: Arc<dyn Synthesizer>,
        transcriber: Arc<dyn Transcriber>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            synthesizer,
            transcriber,
            estimator: None,
            retry_on_fault: config.retry_on_fault,
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
        }
    }

    /// Feed accepted audio durations back into `estimator`.
    pub fn with_estimator(mut self, estimator: Arc<DurationEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_retry_on_fault(mut self, retry: bool) -> Self {
        self.retry_on_fault = retry;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run the loop for `text`.
    ///
    /// # Errors
    ///
    /// [`VerifyError`] for malformed input only.  Every other way the loop
    /// can end is an `Ok` result with the matching [`VerificationOutcome`].
    pub async fn run(
        &self,
        text: &str,
        options: &VerifyOptions,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerifyError> {
        validate(text, options)?;

        let max = options.max_attempts;
        let mut state = VerifyState::default();
        let mut attempt: u32 = 1;
        let mut attempts_used: u32 = 0;
        let mut audio: Option<SynthesizedAudio> = None;
        let mut transcript: Option<Transcript> = None;
        let mut attempts: Vec<VerificationAttempt> = Vec::new();
        let mut ended: Option<VerificationOutcome> = None;

        while !state.is_terminal() {
            log::trace!("verify: attempt {attempt}/{max} → {}", state.label());

            state = match state {
                VerifyState::Generate => match cancel.checkpoint() {
                    Err(reason) => {
                        ended = Some(VerificationOutcome::Cancelled { reason });
                        VerifyState::Fail
                    }
                    Ok(()) => {
                        attempts_used = attempt;
                        match self.synthesize(text, &options.tts).await {
                            Ok(bytes) => {
                                log::debug!(
                                    "verify: attempt {attempt}/{max} synthesized {} bytes",
                                    bytes.len()
                                );
                                audio = Some(SynthesizedAudio {
                                    bytes,
                                    attempt_number: attempt,
                                });
                                VerifyState::Transcribe
                            }
                            Err(e) => self.on_fault(attempt, max, &e.to_string(), &mut ended),
                        }
                    }
                },

                VerifyState::Transcribe => match cancel.checkpoint() {
                    Err(reason) => {
                        ended = Some(VerificationOutcome::Cancelled { reason });
                        VerifyState::Fail
                    }
                    Ok(()) => {
                        let bytes = audio.as_ref().map_or(&[][..], |a| a.bytes.as_slice());
                        match self.transcribe(bytes, &options.language).await {
                            Ok(t) => {
                                transcript = Some(t);
                                VerifyState::Score
                            }
                            Err(e) => self.on_fault(attempt, max, &e.to_string(), &mut ended),
                        }
                    }
                },

                VerifyState::Score => self.score(
                    text,
                    options,
                    attempt,
                    audio.take().zip(transcript.take()),
                    &mut attempts,
                    &mut ended,
                ),

                VerifyState::Retry => {
                    attempt += 1;
                    VerifyState::Generate
                }

                VerifyState::Accept | VerifyState::Fail => state,
            };
        }

        let outcome = if state == VerifyState::Accept {
            self.record_calibration(text, attempts.last());
            VerificationOutcome::Accepted
        } else {
            ended.unwrap_or(VerificationOutcome::ThresholdMiss)
        };

        match &outcome {
            VerificationOutcome::Accepted => {
                log::info!("verify: accepted on attempt {attempts_used}/{max}")
            }
            VerificationOutcome::ThresholdMiss => {
                log::warn!("verify: no attempt reached the threshold after {attempts_used} attempts")
            }
            VerificationOutcome::HardFault { error } => {
                log::error!("verify: giving up after attempt {attempts_used}/{max}: {error}")
            }
            VerificationOutcome::Cancelled { reason } => {
                log::warn!("verify: stopped after {attempts_used} attempts: {reason}")
            }
        }

        Ok(VerificationResult::from_attempts(
            outcome,
            attempts_used,
            attempts,
        ))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn synthesize(&self, text: &str, params: &TtsParams) -> Result<Vec<u8>, SynthesisError> {
        match tokio::time::timeout(self.provider_timeout, self.synthesizer.synthesize(text, params)).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout),
        }
    }

    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<Transcript, TranscriptionError> {
        match tokio::time::timeout(self.provider_timeout, self.transcriber.transcribe(audio, language)).await {
            Ok(result) => result,
            Err(_) => Err(TranscriptionError::Timeout),
        }
    }

    /// Record the attempt's score and pick the next state.
    ///
    /// `pending` is the audio and transcript of the current attempt.  Without
    /// them the run ends as a hard fault instead of regenerating, so an
    /// attempt can never repeat without being counted.
    fn score(
        &self,
        text: &str,
        options: &VerifyOptions,
        attempt: u32,
        pending: Option<(SynthesizedAudio, Transcript)>,
        attempts: &mut Vec<VerificationAttempt>,
        ended: &mut Option<VerificationOutcome>,
    ) -> VerifyState {
        let max = options.max_attempts;
        let Some((audio, transcript)) = pending else {
            *ended = Some(VerificationOutcome::HardFault {
                error: format!("attempt {attempt} reached scoring without audio and transcript"),
            });
            return VerifyState::Fail;
        };

        let score = normalized_similarity(text, &transcript.text);
        log::info!(
            "verify: attempt {attempt}/{max} similarity {score:.3} (threshold {:.3})",
            options.accuracy_threshold
        );

        attempts.push(VerificationAttempt {
            attempt_number: attempt,
            audio,
            audio_duration: transcript.audio_duration(),
            transcript_text: transcript.text,
            transcript_segments: transcript.segments,
            similarity_score: score,
            timestamp_ms: now_ms(),
        });

        if score >= options.accuracy_threshold {
            VerifyState::Accept
        } else if attempt >= max {
            *ended = Some(VerificationOutcome::ThresholdMiss);
            VerifyState::Fail
        } else {
            VerifyState::Retry
        }
    }

    fn on_fault(
        &self,
        attempt: u32,
        max: u32,
        error: &str,
        ended: &mut Option<VerificationOutcome>,
    ) -> VerifyState {
        if self.retry_on_fault && attempt < max {
            log::warn!("verify: attempt {attempt}/{max} failed, retrying: {error}");
            VerifyState::Retry
        } else {
            *ended = Some(VerificationOutcome::HardFault {
                error: error.to_string(),
            });
            VerifyState::Fail
        }
    }

    fn record_calibration(&self, text: &str, accepted: Option<&VerificationAttempt>) {
        let (Some(estimator), Some(accepted)) = (&self.estimator, accepted) else {
            return;
        };
        let predicted = estimator.calculate(text).uncorrected_duration();
        estimator.record_observation(predicted, accepted.audio_duration);
    }
}

fn validate(text: &str, options: &VerifyOptions) -> Result<(), VerifyError> {
    if text.trim().is_empty() {
        return Err(VerifyError::EmptyText);
    }
    if options.max_attempts == 0 {
        return Err(VerifyError::ZeroAttempts);
    }
    if !(0.0..=1.0).contains(&options.accuracy_threshold) {
        return Err(VerifyError::InvalidThreshold(options.accuracy_threshold));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::stt::{transcript_of, ScriptedTranscriber};
    use crate::tts::ScriptedSynthesizer;

    const SCRIPT: &str = "abcdefghijklmnopqrst";
    // 16 of 20 characters match: ratio 0.8
    const NEAR_MISS: &str = "abcdefghijklmnopwxyz";
    // Last character dropped: ratio 38/39
    const CLOSE: &str = "abcdefghijklmnopqrs";
    // 19 of 20 characters match: ratio 0.95, the default threshold
    const AT_THRESHOLD: &str = "abcdefghijklmnopqrsz";

    fn options() -> VerifyOptions {
        VerifyOptions {
            language: "en".into(),
            ..VerifyOptions::default()
        }
    }

    fn verifier(
        tts: Arc<ScriptedSynthesizer>,
        stt: Arc<ScriptedTranscriber>,
    ) -> NarrationVerificationLoop {
        NarrationVerificationLoop::new(tts, stt)
    }

    // ---- Test doubles ---

    /// Cancels the token while "synthesizing".
    struct CancellingSynthesizer(CancellationToken);

    #[async_trait]
    impl Synthesizer for CancellingSynthesizer {
        async fn synthesize(&self, _text: &str, _params: &TtsParams) -> Result<Vec<u8>, SynthesisError> {
            self.0.cancel();
            Ok(vec![1, 2, 3])
        }
    }

    /// Never answers.
    struct StalledSynthesizer;

    #[async_trait]
    impl Synthesizer for StalledSynthesizer {
        async fn synthesize(&self, _text: &str, _params: &TtsParams) -> Result<Vec<u8>, SynthesisError> {
            std::future::pending().await
        }
    }

    // ---- Accept / threshold miss ---

    #[tokio::test]
    async fn accepts_on_first_exact_transcript() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));

        let r = verifier(tts.clone(), stt.clone())
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(r.success());
        assert_eq!(r.attempts_used, 1);
        assert_eq!(r.similarity_score, 1.0);
        assert_eq!(tts.calls(), 1);
        assert_eq!(stt.calls(), 1);
    }

    #[tokio::test]
    async fn retries_until_transcript_matches() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::new(vec![
            Ok(transcript_of(NEAR_MISS, 2.0)),
            Ok(transcript_of(SCRIPT, 2.5)),
        ]));

        let r = verifier(tts.clone(), stt)
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(r.success());
        assert_eq!(r.attempts_used, 2);
        assert_eq!(r.attempts.len(), 2);
        assert!((r.attempts[0].similarity_score - 0.8).abs() < 1e-9);
        // Audio of the second synthesis call is the one returned.
        assert_eq!(r.audio.unwrap().bytes, vec![2u8; 4]);
        assert_eq!(r.audio_duration, 2.5);
        assert_eq!(tts.texts(), vec![SCRIPT, SCRIPT]);
    }

    #[tokio::test]
    async fn threshold_miss_after_max_attempts() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(NEAR_MISS, 2.0));

        let r = verifier(tts.clone(), stt)
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!r.success());
        assert!(r.error().is_none());
        assert_eq!(r.outcome, VerificationOutcome::ThresholdMiss);
        assert_eq!(r.attempts_used, 5);
        assert_eq!(tts.calls(), 5);
        // Best effort: earliest of the equally scored attempts.
        assert_eq!(r.audio.unwrap().attempt_number, 1);
        assert_eq!(r.transcript_text, NEAR_MISS);
    }

    #[tokio::test]
    async fn threshold_miss_keeps_best_attempt() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::new(vec![
            Ok(transcript_of("zzzzzzzzzz", 1.0)),
            Ok(transcript_of(NEAR_MISS, 2.0)),
            Ok(transcript_of("zzzzzzzzzz", 1.0)),
        ]));
        let opts = VerifyOptions {
            max_attempts: 3,
            ..options()
        };

        let r = verifier(tts, stt)
            .run(SCRIPT, &opts, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(r.attempts_used, 3);
        assert_eq!(r.audio.as_ref().unwrap().attempt_number, 2);
        assert!((r.similarity_score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn normalization_ignores_case_and_punctuation() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always("hello world", 1.0));

        let r = verifier(tts, stt)
            .run("Hello, World!", &options(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(r.success());
    }

    #[tokio::test]
    async fn accepts_close_transcript_below_perfect() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::new(vec![
            Ok(transcript_of(NEAR_MISS, 2.0)),
            Ok(transcript_of(CLOSE, 2.0)),
        ]));

        let r = verifier(tts, stt)
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(r.success());
        assert_eq!(r.attempts_used, 2);
        assert!((r.similarity_score - 38.0 / 39.0).abs() < 1e-9);
        assert!(r.similarity_score < 1.0);
        assert_eq!(r.transcript_text, CLOSE);
    }

    #[tokio::test]
    async fn score_equal_to_threshold_is_accepted() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(AT_THRESHOLD, 2.0));
        let opts = options();

        let r = verifier(tts.clone(), stt)
            .run(SCRIPT, &opts, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(r.similarity_score, opts.accuracy_threshold);
        assert!(r.success());
        assert_eq!(r.attempts_used, 1);
        assert_eq!(tts.calls(), 1);
    }

    #[test]
    fn scoring_without_attempt_data_is_a_hard_fault() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 1.0));
        let mut attempts = Vec::new();
        let mut ended = None;

        let next = verifier(tts, stt).score(SCRIPT, &options(), 1, None, &mut attempts, &mut ended);

        assert_eq!(next, VerifyState::Fail);
        assert!(attempts.is_empty());
        assert!(matches!(ended, Some(VerificationOutcome::HardFault { .. })));
    }

    // ---- Faults ---

    #[tokio::test]
    async fn fault_consumes_attempt_and_retries() {
        let tts = Arc::new(ScriptedSynthesizer::with_failures(vec![Some(
            SynthesisError::RateLimited,
        )]));
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));

        let r = verifier(tts.clone(), stt.clone())
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(r.success());
        assert_eq!(r.attempts_used, 2);
        assert_eq!(stt.calls(), 1);
        assert_eq!(r.attempts[0].attempt_number, 2);
    }

    #[tokio::test]
    async fn fault_without_retry_fails_immediately() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::new(vec![Err(
            TranscriptionError::Rejected {
                status: 400,
                message: "bad audio".into(),
            },
        )]));

        let r = verifier(tts.clone(), stt)
            .with_retry_on_fault(false)
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!r.success());
        assert!(r.error().unwrap().contains("bad audio"));
        assert_eq!(r.attempts_used, 1);
        assert_eq!(tts.calls(), 1);
        assert!(r.audio.is_none());
    }

    #[tokio::test]
    async fn fault_on_last_attempt_is_hard_fault() {
        let tts = Arc::new(ScriptedSynthesizer::with_failures(vec![
            Some(SynthesisError::EmptyAudio),
            Some(SynthesisError::EmptyAudio),
        ]));
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));
        let opts = VerifyOptions {
            max_attempts: 2,
            ..options()
        };

        let r = verifier(tts.clone(), stt)
            .run(SCRIPT, &opts, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(r.outcome, VerificationOutcome::HardFault { .. }));
        assert_eq!(r.attempts_used, 2);
        assert_eq!(tts.calls(), 2);
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));
        let r = NarrationVerificationLoop::new(Arc::new(StalledSynthesizer), stt)
            .with_retry_on_fault(false)
            .with_provider_timeout(Duration::from_millis(20))
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(r.error().unwrap().contains("timed out"));
    }

    // ---- Cancellation ---

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let r = verifier(tts.clone(), stt)
            .run(SCRIPT, &options(), &cancel)
            .await
            .unwrap();

        assert!(matches!(r.outcome, VerificationOutcome::Cancelled { .. }));
        assert_eq!(r.attempts_used, 0);
        assert_eq!(tts.calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_transcribe() {
        let cancel = CancellationToken::new();
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));

        let r = NarrationVerificationLoop::new(
            Arc::new(CancellingSynthesizer(cancel.clone())),
            stt.clone(),
        )
        .run(SCRIPT, &options(), &cancel)
        .await
        .unwrap();

        assert_eq!(r.error(), Some("job cancelled"));
        assert_eq!(r.attempts_used, 1);
        assert_eq!(stt.calls(), 0);
    }

    // ---- Calibration ---

    #[tokio::test]
    async fn accept_feeds_estimator() {
        let estimator = Arc::new(DurationEstimator::for_language("en"));
        let tts = Arc::new(ScriptedSynthesizer::ok());
        // One English word at 150 wpm predicts 0.4 s; the audio lasted 0.8 s.
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 0.8));

        verifier(tts, stt)
            .with_estimator(estimator.clone())
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert!((estimator.correction_factor() - 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn threshold_miss_leaves_estimator_alone() {
        let estimator = Arc::new(DurationEstimator::for_language("en"));
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(NEAR_MISS, 0.8));

        verifier(tts, stt)
            .with_estimator(estimator.clone())
            .run(SCRIPT, &options(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(estimator.correction_factor(), 1.0);
    }

    // ---- Malformed input ---

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let tts = Arc::new(ScriptedSynthesizer::ok());
        let stt = Arc::new(ScriptedTranscriber::always(SCRIPT, 2.0));
        let v = verifier(tts.clone(), stt);
        let cancel = CancellationToken::new();

        assert_eq!(
            v.run("   ", &options(), &cancel).await,
            Err(VerifyError::EmptyText)
        );
        let zero = VerifyOptions {
            max_attempts: 0,
            ..options()
        };
        assert_eq!(v.run(SCRIPT, &zero, &cancel).await, Err(VerifyError::ZeroAttempts));
        let bad = VerifyOptions {
            accuracy_threshold: 1.5,
            ..options()
        };
        assert_eq!(
            v.run(SCRIPT, &bad, &cancel).await,
            Err(VerifyError::InvalidThreshold(1.5))
        );
        assert_eq!(tts.calls(), 0);
    }
}
