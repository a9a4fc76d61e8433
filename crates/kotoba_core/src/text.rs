//! Text normalization helpers shared by the segmenter and the store.

/// Remove punctuation and symbols, keeping letters, digits, underscores and
/// whitespace. Unicode-aware, so kana/kanji/hangul survive while `。`, `、`,
/// `！` and their ASCII counterparts are dropped.
pub fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect()
}

/// True when the two strings differ by punctuation alone.
pub fn equal_ignoring_punctuation(a: &str, b: &str) -> bool {
    strip_punctuation(a) == strip_punctuation(b)
}
