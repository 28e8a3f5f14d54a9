//! Search directive construction.
//!
//! Maps raw user input to the query string handed to the fulltext search
//! primitive. Users who type boolean operators themselves get their query
//! passed through verbatim; everyone else gets per-word wildcard/required
//! terms derived from word length.

use crate::normalize::normalize;

/// Characters that signal the user is writing boolean search syntax directly.
const OPERATOR_CHARS: [char; 6] = ['*', '+', '-', '"', '(', ')'];

/// Word length (in chars) at or below which a token becomes a required exact
/// term instead of a prefix-wildcard term. Very short Vietnamese words ("ba",
/// "mẹ") explode as wildcards.
const MAX_EXACT_TERM_LEN: usize = 2;

/// How the fulltext primitive should interpret [`SearchDirective::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// The user supplied operator characters; the query is their literal
    /// input and is assumed to already be valid boolean syntax.
    BooleanPassthrough,
    /// Engine-built terms: `+tok` for short tokens, `tok*` otherwise.
    BooleanWildcard,
}

/// The engine's output query string plus its interpretation mode.
/// Consumed by the storage search primitive, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDirective {
    pub query: String,
    pub mode: SearchMode,
}

/// Build the search directive for a raw user query.
///
/// Returns `None` for empty/whitespace-only input (empty result set upstream,
/// not an error). Token length is measured in chars, not bytes — "bé" is a
/// two-char token.
pub fn build_directive(raw_query: &str) -> Option<SearchDirective> {
    if raw_query.trim().is_empty() {
        return None;
    }

    if raw_query.contains(OPERATOR_CHARS) {
        return Some(SearchDirective {
            query: raw_query.to_string(),
            mode: SearchMode::BooleanPassthrough,
        });
    }

    let normalized = normalize(raw_query);
    let terms: Vec<String> = normalized
        .split(' ')
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            if tok.chars().count() <= MAX_EXACT_TERM_LEN {
                format!("+{tok}")
            } else {
                format!("{tok}*")
            }
        })
        .collect();

    // Degenerate fallback kept as-is: a query that normalizes to nothing is
    // sent through literally in wildcard mode.
    if terms.is_empty() {
        return Some(SearchDirective {
            query: raw_query.to_string(),
            mode: SearchMode::BooleanWildcard,
        });
    }

    Some(SearchDirective {
        query: terms.join(" "),
        mode: SearchMode::BooleanWildcard,
    })
}
