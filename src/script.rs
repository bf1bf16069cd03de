//! Narration units: the ordered pieces a script is split into.
//!
//! Splitting a script into slides or story blocks happens upstream; the
//! engine only consumes the resulting units.

use serde::{Deserialize, Serialize};

/// One ordered, immutable piece of a script that the renderer shows for a
/// contiguous span of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationUnit {
    /// 0-based position; defines canonical order.
    pub index: usize,
    /// Text spoken for this unit.  Must not be empty.
    pub text: String,
    /// Duration the caller expects, in seconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration: Option<f64>,
}

impl NarrationUnit {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            expected_duration: None,
        }
    }

    pub fn with_expected_duration(mut self, seconds: f64) -> Self {
        self.expected_duration = Some(seconds);
        self
    }
}

/// Number `texts` as units `0, 1, 2, …`.
///
/// ```
/// use narration_sync::script::units_from_texts;
///
/// let units = units_from_texts(["Intro", "Body", "Outro"]);
/// assert_eq!(units[2].index, 2);
/// assert_eq!(units[2].text, "Outro");
/// ```
pub fn units_from_texts<I, S>(texts: I) -> Vec<NarrationUnit>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| NarrationUnit::new(index, text))
        .collect()
}

/// The text sent to the synthesizer: every unit's text, one per line.
pub fn full_script(units: &[NarrationUnit]) -> String {
    units
        .iter()
        .map(|u| u.text.trim())
        .collect::<Vec<_>>()
        .join("\n")
}
