//! Core `Transcriber` trait and implementations.
//!
//! # Overview
//!
//! [`Transcriber`] is the speech-to-text collaborator used by the
//! verification loop.  It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn Transcriber>`.
//!
//! [`ApiTranscriber`] calls any OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint.  All connection details come from
//! [`SttConfig`]; nothing is hardcoded.
//!
//! `ScriptedTranscriber` (available under `#[cfg(test)]`) replays a fixed
//! sequence of responses, which lets the loop be tested without a provider.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::config::SttConfig;
use crate::stt::transcribe::Transcript;

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// Errors that can occur while transcribing synthesized audio.
#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete in time.
    #[error("transcription request timed out")]
    Timeout,

    /// The provider throttled the request (HTTP 429).
    #[error("transcription provider rate-limited the request")]
    RateLimited,

    /// The provider refused the request.
    #[error("transcription provider rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response could not be parsed as a transcript.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Async trait for speech-to-text providers.
///
/// # Arguments
/// * `audio`    – Encoded audio as returned by the synthesizer.
/// * `language` – ISO-639-1 code of the spoken language, or `"auto"`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: &str)
        -> Result<Transcript, TranscriptionError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// ApiTranscriber
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint and asks
/// for segment-level timestamps (`verbose_json`).
pub struct ApiTranscriber {
    client: reqwest::Client,
    config: SttConfig,
    upload_name: String,
}

impl ApiTranscriber {
    /// Container assumed for uploads until [`with_audio_format`] says otherwise.
    ///
    /// [`with_audio_format`]: ApiTranscriber::with_audio_format
    pub const DEFAULT_AUDIO_FORMAT: &'static str = "mp3";

    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
            upload_name: upload_name(Self::DEFAULT_AUDIO_FORMAT),
        }
    }

    /// Name uploads after the synthesizer's `response_format` (`wav`,
    /// `opus`, …) so providers that sniff the extension accept them.
    pub fn with_audio_format(mut self, format: &str) -> Self {
        self.upload_name = upload_name(format);
        self
    }

    /// File name attached to the uploaded audio part.
    pub fn upload_name(&self) -> &str {
        &self.upload_name
    }
}

/// `narration.<format>`, falling back to mp3 for anything that is not a
/// plain alphanumeric extension.
fn upload_name(format: &str) -> String {
    let format = format.trim().to_ascii_lowercase();
    let valid = !format.is_empty() && format.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        format!("narration.{format}")
    } else {
        log::warn!("stt: unusable audio format {format:?}, uploading as mp3");
        format!("narration.{}", ApiTranscriber::DEFAULT_AUDIO_FORMAT)
    }
}

#[async_trait]
impl Transcriber for ApiTranscriber {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn transcribe(
        &self,
        audio: &[u8],
        language: &str,
    ) -> Result<Transcript, TranscriptionError> {
        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec()).file_name(self.upload_name.clone()),
            )
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if !language.is_empty() && language != "auto" {
            form = form.text("language", language.to_string());
        }

        let mut req = self.client.post(&url).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(TranscriptionError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Rejected {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        response
            .json::<Transcript>()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))
    }
}

/// First `max_chars` characters of `s`.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// ScriptedTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays pre-configured responses in order.
///
/// The last response repeats once the script runs out.
#[cfg(test)]
pub struct ScriptedTranscriber {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<Transcript, TranscriptionError>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedTranscriber {
    pub fn new(responses: Vec<Result<Transcript, TranscriptionError>>) -> Self {
        assert!(!responses.is_empty(), "script needs at least one response");
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Always transcribe to `text` with a single segment spanning `duration`.
    pub fn always(text: &str, duration: f64) -> Self {
        Self::new(vec![Ok(transcript_of(text, duration))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Single-segment transcript of `text` lasting `duration` seconds.
#[cfg(test)]
pub fn transcript_of(text: &str, duration: f64) -> Transcript {
    Transcript {
        text: text.to_string(),
        segments: vec![crate::stt::TranscriptSegment::new(0.0, duration, text)],
        duration,
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _language: &str,
    ) -> Result<Transcript, TranscriptionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
