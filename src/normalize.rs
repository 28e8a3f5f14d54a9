//! Query/title text normalization for accent-insensitive matching.
//!
//! Two independent steps: `normalize` handles case and whitespace,
//! `strip_diacritics` removes Vietnamese tonal/accent marks. Callers compose
//! them as needed — ranking compares lowercased text both with and without
//! diacritics, so stripping must not lowercase on its own.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, trim, and collapse every whitespace run to a single space.
/// Returns `""` for empty or whitespace-only input.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&word.to_lowercase());
    }
    out
}

/// Remove diacritics via NFD decomposition + combining-mark removal.
///
/// đ/Đ do not decompose under NFD (they are base letters, not accented ones),
/// so they are mapped to d/D explicitly. Case is preserved; lowercasing is a
/// separate step. Idempotent: stripping already-stripped text is a no-op.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            c => c,
        })
        .collect()
}

/// Split normalized text into its word tokens.
/// `normalize` guarantees single-space separation, so this is a plain split.
pub fn query_words(normalized: &str) -> Vec<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Người   Nhện  "), "người nhện");
        assert_eq!(normalize("one\t\ntwo"), "one two");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize("AVATAR"), "avatar");
    }

    #[test]
    fn test_strip_diacritics_vietnamese() {
        // Case preserved, only marks removed
        assert_eq!(strip_diacritics("Hành Động"), "Hanh Dong");
        assert_eq!(strip_diacritics("Người Nhện"), "Nguoi Nhen");
    }

    #[test]
    fn test_strip_diacritics_d_bar() {
        assert_eq!(strip_diacritics("đi đâu đó"), "di dau do");
        assert_eq!(strip_diacritics("Đất"), "Dat");
    }

    #[test]
    fn test_strip_diacritics_idempotent() {
        let once = strip_diacritics("Hành Động đêm Đông");
        assert_eq!(strip_diacritics(&once), once);
    }

    #[test]
    fn test_strip_diacritics_plain_ascii_untouched() {
        assert_eq!(strip_diacritics("Spider-Man 2"), "Spider-Man 2");
        assert_eq!(strip_diacritics(""), "");
    }

    #[test]
    fn test_query_words_order_preserved() {
        assert_eq!(
            query_words("người nhện xa nhà"),
            vec!["người", "nhện", "xa", "nhà"]
        );
        assert!(query_words("").is_empty());
    }
}
