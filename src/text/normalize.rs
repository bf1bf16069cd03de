//! Comparison-form normalization.

/// Reduce `text` to the form used for similarity scoring.
///
/// Lower-cases every character and drops whitespace and punctuation, so
/// that `"Slide 1."` and `"slide1"` compare equal.  Letters and digits of
/// every script are kept.
///
/// ```
/// use narration_sync::text::normalize;
///
/// assert_eq!(normalize("Hello, World!"), "helloworld");
/// assert_eq!(normalize("슬라이드 1입니다."), "슬라이드1입니다");
/// assert_eq!(normalize("  \n"), "");
/// ```
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
