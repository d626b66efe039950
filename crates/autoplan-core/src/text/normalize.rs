//! Hashtag and symbol handling, plus the normalized keys used to compare
//! topics and section labels.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("hashtag pattern is valid"));

/// Extract `#word` tokens in order of appearance, dropping case-insensitive
/// duplicates (the first spelling wins).
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Remove hashtag tokens, keeping line structure.
///
/// Whitespace left behind inside a line is collapsed; a line that held only
/// hashtags becomes empty.
pub fn strip_hashtags(text: &str) -> String {
    text.lines()
        .map(|line| {
            HASHTAG_RE
                .replace_all(line, "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether `c` is a decorative pictograph (emoji, dingbat, joiner).
pub fn is_decorative(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF
        | 0x2190..=0x21FF
        | 0x25A0..=0x25FF
        | 0x2300..=0x23FF
        | 0xFE00..=0xFE0F
        | 0x200D
        | 0x20E3
        | 0xE0020..=0xE007F)
}

/// Remove decorative pictographs and tidy the spacing they leave.
pub fn strip_decorative(text: &str) -> String {
    text.chars()
        .filter(|c| !is_decorative(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, accent-free form of a single character.
///
/// Always yields exactly one char, so folded strings line up with the
/// original character by character.
pub fn fold_char(c: char) -> char {
    let base = std::iter::once(c).nfd().next().unwrap_or(c);
    base.to_lowercase().next().unwrap_or(base)
}

/// Remove diacritics (`"Ação"` -> `"Acao"`).
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison key: lowercase, accents stripped, every run of punctuation or
/// whitespace collapsed to a single space, trimmed.
pub fn normalize_key(text: &str) -> String {
    strip_accents(text)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
