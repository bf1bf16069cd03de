//! Engine settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across worker
//! tasks.  Every section is `#[serde(default)]`, so a settings file only
//! needs to name the values it overrides.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// EstimatorConfig
// ---------------------------------------------------------------------------

/// Settings for the duration-prediction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Language used when a job does not name one (ISO-639-1).
    pub default_language: String,
    /// Pause added for every sentence-final mark (`.`, `!`, `?`, `。` …).
    pub sentence_pause_secs: f64,
    /// Pause added for every comma-class mark (`,`, `;`, `:`, `、` …).
    pub comma_pause_secs: f64,
    /// Pause added for every line break.
    pub newline_pause_secs: f64,
    /// Reading speed overrides in units per minute, keyed by language code.
    ///
    /// The unit is words for space-delimited languages and characters for
    /// Korean, Japanese, Chinese and Thai.
    pub reading_speed_overrides: BTreeMap<String, f64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            default_language: "ko".into(),
            sentence_pause_secs: 0.5,
            comma_pause_secs: 0.3,
            newline_pause_secs: 0.4,
            reading_speed_overrides: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// VerificationConfig
// ---------------------------------------------------------------------------

/// Settings for the synthesize → transcribe → score loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Maximum number of synthesis attempts per script.
    pub max_attempts: u32,
    /// Minimum similarity (0.0 – 1.0) between script and transcript for the
    /// audio to be accepted.
    pub accuracy_threshold: f64,
    /// Whether a provider fault consumes an attempt and retries (`true`) or
    /// ends the loop immediately (`false`).
    pub retry_on_fault: bool,
    /// Maximum seconds a single synthesis or transcription call may take.
    pub provider_timeout_secs: u64,
    /// Wall-clock budget for a whole job.  `None` means unbounded.
    pub job_timeout_secs: Option<u64>,
    /// Continue to alignment with the best-scoring audio when the threshold
    /// is never reached.
    pub accept_best_effort: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            accuracy_threshold: 0.95,
            retry_on_fault: true,
            provider_timeout_secs: 120,
            job_timeout_secs: None,
            accept_best_effort: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AlignmentConfig
// ---------------------------------------------------------------------------

/// Settings for mapping transcript segments back onto narration units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Minimum similarity for a transcript window to count as a match.
    pub min_match_ratio: f64,
    /// Gaps between adjacent units up to this many seconds are closed.
    pub gap_fill_secs: f64,
    /// The last unit is stretched to the end of the audio when it ends
    /// within this many seconds of it.
    pub tail_extend_secs: f64,
    /// Upper bound on the number of segments in a candidate window.
    /// `None` searches every window size.
    pub max_window_segments: Option<usize>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_match_ratio: 0.80,
            gap_fill_secs: 0.5,
            tail_extend_secs: 1.0,
            max_window_segments: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-synthesis provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Base URL of an OpenAI-compatible API (`/v1/audio/speech`).
    pub base_url: String,
    /// API key; `None` for local providers.
    pub api_key: Option<String>,
    /// Synthesis model identifier (e.g. `"tts-1"`).
    pub model: String,
    /// Voice identifier sent with every request.
    pub voice_id: String,
    /// Audio container requested from the provider (e.g. `"mp3"`).
    pub response_format: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "tts-1".into(),
            voice_id: "alloy".into(),
            response_format: "mp3".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible API (`/v1/audio/transcriptions`).
    pub base_url: String,
    /// API key; `None` for local providers.
    pub api_key: Option<String>,
    /// Transcription model identifier (e.g. `"whisper-1"`).
    pub model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Settings for the optional timing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Write aligned timings to disk after every job.
    pub enabled: bool,
    /// Directory for `<project>.json` files.  `None` uses
    /// [`AppPaths::timings_dir`].
    pub timings_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timings_dir: None,
        }
    }
}

impl StorageConfig {
    /// The directory timings are written to.
    pub fn resolved_dir(&self) -> PathBuf {
        self.timings_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().timings_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level engine configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use narration_sync::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Duration-prediction model settings.
    pub estimator: EstimatorConfig,
    /// Verification loop settings.
    pub verification: VerificationConfig,
    /// Segment alignment settings.
    pub alignment: AlignmentConfig,
    /// Speech-synthesis provider settings.
    pub tts: TtsConfig,
    /// Transcription provider settings.
    pub stt: SttConfig,
    /// Timing store settings.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet so
    /// callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(
            original.estimator.default_language,
            loaded.estimator.default_language
        );
        assert_eq!(
            original.estimator.sentence_pause_secs,
            loaded.estimator.sentence_pause_secs
        );
        assert_eq!(
            original.verification.max_attempts,
            loaded.verification.max_attempts
        );
        assert_eq!(
            original.verification.accuracy_threshold,
            loaded.verification.accuracy_threshold
        );
        assert_eq!(
            original.alignment.min_match_ratio,
            loaded.alignment.min_match_ratio
        );
        assert_eq!(
            original.alignment.max_window_segments,
            loaded.alignment.max_window_segments
        );
        assert_eq!(original.tts.voice_id, loaded.tts.voice_id);
        assert_eq!(original.tts.api_key, loaded.tts.api_key);
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.storage.enabled, loaded.storage.enabled);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.verification.max_attempts, 5);
        assert_eq!(config.estimator.default_language, "ko");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.verification.max_attempts, 5);
        assert!((cfg.verification.accuracy_threshold - 0.95).abs() < f64::EPSILON);
        assert!(cfg.verification.retry_on_fault);
        assert!(cfg.verification.job_timeout_secs.is_none());
        assert!((cfg.alignment.min_match_ratio - 0.80).abs() < f64::EPSILON);
        assert!((cfg.alignment.gap_fill_secs - 0.5).abs() < f64::EPSILON);
        assert!((cfg.alignment.tail_extend_secs - 1.0).abs() < f64::EPSILON);
        assert!((cfg.estimator.sentence_pause_secs - 0.5).abs() < f64::EPSILON);
        assert!((cfg.estimator.comma_pause_secs - 0.3).abs() < f64::EPSILON);
        assert!((cfg.estimator.newline_pause_secs - 0.4).abs() < f64::EPSILON);
        assert!(cfg.tts.api_key.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[verification]\nmax_attempts = 3\n\n[estimator.reading_speed_overrides]\nko = 300.0\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.verification.max_attempts, 3);
        assert!((cfg.verification.accuracy_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(cfg.estimator.reading_speed_overrides.get("ko"), Some(&300.0));
        assert_eq!(cfg.tts.model, "tts-1");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.verification.max_attempts = 2;
        cfg.verification.job_timeout_secs = Some(600);
        cfg.alignment.max_window_segments = Some(8);
        cfg.tts.api_key = Some("sk-test".into());
        cfg.stt.base_url = "http://localhost:8000".into();
        cfg.storage.timings_dir = Some(PathBuf::from("/tmp/timings"));
        cfg.estimator
            .reading_speed_overrides
            .insert("en".into(), 170.0);

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.verification.max_attempts, 2);
        assert_eq!(loaded.verification.job_timeout_secs, Some(600));
        assert_eq!(loaded.alignment.max_window_segments, Some(8));
        assert_eq!(loaded.tts.api_key, Some("sk-test".into()));
        assert_eq!(loaded.stt.base_url, "http://localhost:8000");
        assert_eq!(
            loaded.storage.resolved_dir(),
            PathBuf::from("/tmp/timings")
        );
        assert_eq!(
            loaded.estimator.reading_speed_overrides.get("en"),
            Some(&170.0)
        );
    }
}
