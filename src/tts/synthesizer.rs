//! Core `Synthesizer` trait and `ApiSynthesizer` implementation.
//!
//! `ApiSynthesizer` calls any OpenAI-compatible `/v1/audio/speech` endpoint.
//! All connection details come from [`TtsConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TtsConfig;
use crate::stt::engine::truncate;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors that can occur during speech synthesis.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// HTTP transport or connection error.
    #[error("synthesis request failed: {0}")]
    Request(String),

    /// The request did not complete in time.
    #[error("synthesis request timed out")]
    Timeout,

    /// The provider throttled the request (HTTP 429).
    #[error("synthesis provider rate-limited the request")]
    RateLimited,

    /// The provider refused the input or the request.
    #[error("synthesis provider rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered successfully but sent no audio.
    #[error("synthesis provider returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TtsParams
// ---------------------------------------------------------------------------

/// Per-request synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsParams {
    /// Provider voice identifier.
    pub voice_id: String,
    /// Provider model identifier.
    pub model: String,
}

impl TtsParams {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            voice_id: config.voice_id.clone(),
            model: config.model.clone(),
        }
    }
}

impl Default for TtsParams {
    fn default() -> Self {
        Self::from_config(&TtsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech providers.
///
/// Implementors must be `Send + Sync` so they can be shared across jobs
/// (e.g. wrapped in `Arc<dyn Synthesizer>`).  Returns the encoded audio.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, params: &TtsParams) -> Result<Vec<u8>, SynthesisError>;
}

// ---------------------------------------------------------------------------
// ApiSynthesizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct ApiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ApiSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Synthesizer for ApiSynthesizer {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn synthesize(&self, text: &str, params: &TtsParams) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/v1/audio/speech", self.config.base_url);

        let body = serde_json::json!({
            "model":           params.model,
            "input":           text,
            "voice":           params.voice_id,
            "response_format": self.config.response_format,
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(SynthesisError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Rejected {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        Ok(audio.to_vec())
    }
}

// ---------------------------------------------------------------------------
// ScriptedSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that succeeds or fails according to a fixed script and
/// records every text it was asked to speak.
///
/// Successful calls return `[n; 4]` where `n` is the 1-based call number,
/// so tests can tell which attempt produced the audio.
#[cfg(test)]
pub struct ScriptedSynthesizer {
    failures: std::sync::Mutex<std::collections::VecDeque<Option<SynthesisError>>>,
    texts: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedSynthesizer {
    /// Always succeed.
    pub fn ok() -> Self {
        Self::with_failures(Vec::new())
    }

    /// `failures[i]` decides call `i + 1`; calls past the end succeed.
    pub fn with_failures(failures: Vec<Option<SynthesisError>>) -> Self {
        Self {
            failures: std::sync::Mutex::new(failures.into()),
            texts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str, _params: &TtsParams) -> Result<Vec<u8>, SynthesisError> {
        let call = {
            let mut texts = self.texts.lock().unwrap();
            texts.push(text.to_string());
            texts.len()
        };
        match self.failures.lock().unwrap().pop_front().flatten() {
            Some(err) => Err(err),
            None => Ok(vec![call as u8; 4]),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
