//! Per-language reading-speed profiles and the punctuation pause table.

use crate::config::EstimatorConfig;

// ---------------------------------------------------------------------------
// UnitKind
// ---------------------------------------------------------------------------

/// What a language's reading speed is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Whitespace-delimited words (English, Spanish, …).
    Words,
    /// Letters and digits, ignoring whitespace and punctuation.  Used for
    /// scripts without universal word boundaries or with long agglutinated
    /// words (Korean, Japanese, Chinese, Thai).
    Characters,
}

impl UnitKind {
    /// Count the linguistic units in `text`.
    pub fn count(self, text: &str) -> usize {
        match self {
            UnitKind::Words => text
                .split_whitespace()
                .filter(|w| w.chars().any(char::is_alphanumeric))
                .count(),
            UnitKind::Characters => text.chars().filter(|c| c.is_alphanumeric()).count(),
        }
    }
}

// ---------------------------------------------------------------------------
// PauseTable
// ---------------------------------------------------------------------------

/// Seconds of silence a narrator inserts at punctuation and line breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct PauseTable {
    pub sentence_end: f64,
    pub comma: f64,
    pub newline: f64,
}

impl PauseTable {
    const SENTENCE_END: &'static [char] = &['.', '!', '?', '…', '。', '！', '？'];
    const COMMA: &'static [char] = &[',', ';', ':', '、', '，', '；', '：'];

    /// Pause contributed by a single character, `0.0` for ordinary text.
    pub fn pause_for(&self, c: char) -> f64 {
        if c == '\n' {
            self.newline
        } else if Self::SENTENCE_END.contains(&c) {
            self.sentence_end
        } else if Self::COMMA.contains(&c) {
            self.comma
        } else {
            0.0
        }
    }

    /// Sum of all pauses in `text`.
    pub fn total(&self, text: &str) -> f64 {
        text.chars().map(|c| self.pause_for(c)).sum()
    }
}

impl Default for PauseTable {
    fn default() -> Self {
        Self {
            sentence_end: 0.5,
            comma: 0.3,
            newline: 0.4,
        }
    }
}

// ---------------------------------------------------------------------------
// LanguageProfile
// ---------------------------------------------------------------------------

/// Reading-speed model for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageProfile {
    /// Primary language subtag (`"ko"`, `"en"`, …).
    pub language: String,
    pub unit_kind: UnitKind,
    /// Average narration speed in [`UnitKind`] units per minute.
    pub units_per_minute: f64,
    pub pauses: PauseTable,
}

impl LanguageProfile {
    /// Built-in profile for `language`, falling back to an English-like
    /// word model for languages without a dedicated entry.
    pub fn builtin(language: &str) -> Self {
        let language = primary_subtag(language);
        let (unit_kind, units_per_minute) = match language.as_str() {
            "ko" => (UnitKind::Characters, 320.0),
            "ja" => (UnitKind::Characters, 350.0),
            "zh" => (UnitKind::Characters, 250.0),
            "th" => (UnitKind::Characters, 400.0),
            "en" => (UnitKind::Words, 150.0),
            "es" => (UnitKind::Words, 160.0),
            "fr" => (UnitKind::Words, 155.0),
            "de" => (UnitKind::Words, 130.0),
            _ => (UnitKind::Words, 150.0),
        };
        Self {
            language,
            unit_kind,
            units_per_minute,
            pauses: PauseTable::default(),
        }
    }

    /// Built-in profile with the pause values and any reading-speed
    /// override from `config` applied.
    pub fn from_config(language: &str, config: &EstimatorConfig) -> Self {
        let mut profile = Self::builtin(language);
        profile.pauses = PauseTable {
            sentence_end: config.sentence_pause_secs,
            comma: config.comma_pause_secs,
            newline: config.newline_pause_secs,
        };
        if let Some(&speed) = config.reading_speed_overrides.get(&profile.language) {
            if speed > 0.0 && speed.is_finite() {
                profile.units_per_minute = speed;
            } else {
                log::warn!(
                    "estimator: ignoring invalid reading speed {speed} for {}",
                    profile.language
                );
            }
        }
        profile
    }
}

/// `"ko-KR"` / `"KO_kr"` → `"ko"`.
pub fn primary_subtag(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
