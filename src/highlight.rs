//! Keyword highlighting for autocomplete suggestions.
//!
//! Wraps case-insensitive keyword occurrences in `<mark>` tags for display.
//! Keywords are applied strictly in the order given, each pass rewriting the
//! output of the previous one — overlapping keywords can therefore nest
//! markers. That matches the observed behavior this engine reproduces and is
//! deliberately left uncorrected.
//!
//! Matching is char-aligned (per-char lowercase, one output char per input
//! char) so multibyte Vietnamese titles slice safely.

/// Opening/closing highlight markers inserted around matches.
pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Keywords shorter than this (in chars) are skipped; one-letter keywords
/// would shred the title into noise.
const MIN_KEYWORD_LEN: usize = 2;

/// Wrap every case-insensitive occurrence of each keyword in the text with
/// highlight markers. Returns the text unchanged when it or the keyword list
/// is empty.
pub fn highlight<S: AsRef<str>>(text: &str, keywords: &[S]) -> String {
    if text.is_empty() || keywords.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for keyword in keywords {
        let keyword = keyword.as_ref();
        if keyword.chars().count() < MIN_KEYWORD_LEN {
            continue;
        }
        out = wrap_occurrences(&out, keyword);
    }
    out
}

/// Single-char lowercase that never changes the char count, keeping the
/// lowered text index-aligned with the original.
fn lower_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn wrap_occurrences(text: &str, keyword: &str) -> String {
    let text_chars: Vec<char> = text.chars().collect();
    let lower: Vec<char> = text_chars.iter().map(|c| lower_char(*c)).collect();
    let needle: Vec<char> = keyword.chars().map(lower_char).collect();
    let n = needle.len();

    let mut out = String::with_capacity(text.len() + MARK_OPEN.len() + MARK_CLOSE.len());
    let mut i = 0;
    while i < text_chars.len() {
        if i + n <= lower.len() && lower[i..i + n] == needle[..] {
            out.push_str(MARK_OPEN);
            out.extend(&text_chars[i..i + n]);
            out.push_str(MARK_CLOSE);
            i += n;
        } else {
            out.push(text_chars[i]);
            i += 1;
        }
    }
    out
}
