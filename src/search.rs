//! Request orchestration: search and autocomplete pipelines.
//!
//! Both pipelines are the same shape — build a directive, fetch candidates,
//! fall back to a prefix scan if the fulltext pass found nothing, re-rank —
//! and differ only at the edges: autocomplete caps the candidate window,
//! truncates harder, and highlights the titles it returns.
//!
//! The engine is synchronous and stateless per request; the only side effects
//! are the store reads.

use crate::candidate::Candidate;
use crate::highlight::highlight;
use crate::models::{AutocompleteResponse, SearchResponse, Suggestion, TitleHit};
use crate::normalize::{normalize, query_words, strip_diacritics};
use crate::query::build_directive;
use crate::ranking::{rank, QueryTerms};
use crate::store::{CandidateFetcher, StoreResult};

/// Queries shorter than this (in chars, trimmed) return no suggestions.
pub const AUTOCOMPLETE_MIN_QUERY_LEN: usize = 2;
/// Candidate cap for autocomplete: ranking 200 rows is cheap, and anything
/// past that never surfaces in a ten-entry dropdown anyway.
pub const AUTOCOMPLETE_CANDIDATE_WINDOW: usize = 200;
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

/// The search engine over a candidate store.
pub struct SearchEngine<S: CandidateFetcher> {
    store: S,
}

impl<S: CandidateFetcher> SearchEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch candidates for a directive built from the raw query, falling
    /// back to a normalized-prefix scan when fulltext finds nothing.
    fn fetch_candidates(
        &self,
        raw_query: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Candidate>> {
        let Some(directive) = build_directive(raw_query) else {
            return Ok(Vec::new());
        };
        let candidates = self.store.fulltext_search(&directive, limit)?;
        if !candidates.is_empty() {
            return Ok(candidates);
        }

        let prefix = strip_diacritics(&normalize(raw_query));
        if prefix.is_empty() {
            return Ok(candidates);
        }
        log::debug!("fulltext empty for {raw_query:?}, prefix fallback: {prefix:?}");
        self.store.prefix_search(&prefix, limit)
    }

    /// Ranked title search. `total` counts matches before `limit` truncation.
    pub fn search(&self, raw_query: &str, limit: Option<usize>) -> StoreResult<SearchResponse> {
        let candidates = self.fetch_candidates(raw_query, None)?;
        let ranked = rank(candidates, &query_terms(raw_query));
        let total = ranked.len();
        let hits = ranked
            .iter()
            .take(limit.unwrap_or(total))
            .map(TitleHit::from)
            .collect();
        Ok(SearchResponse { hits, total })
    }

    /// Ranked, highlighted suggestions for a partial query.
    ///
    /// Highlighting runs on the truncated survivors only; `total_considered`
    /// reports how many candidates the ranking pass saw.
    pub fn autocomplete(
        &self,
        raw_query: &str,
        limit: Option<usize>,
    ) -> StoreResult<AutocompleteResponse> {
        if raw_query.trim().chars().count() < AUTOCOMPLETE_MIN_QUERY_LEN {
            return Ok(AutocompleteResponse::default());
        }

        let candidates =
            self.fetch_candidates(raw_query, Some(AUTOCOMPLETE_CANDIDATE_WINDOW))?;
        let terms = query_terms(raw_query);
        let ranked = rank(candidates, &terms);
        let total_considered = ranked.len();

        let keywords: Vec<&str> = terms.lowered_words().collect();
        let suggestions = ranked
            .iter()
            .take(limit.unwrap_or(DEFAULT_AUTOCOMPLETE_LIMIT))
            .map(|c| Suggestion {
                id: c.id,
                title: highlight(c.title(), &keywords),
                original_title: c.original_title().map(str::to_string),
                poster_url: c.poster_url.clone(),
                release_year: c.release_year,
            })
            .collect();

        Ok(AutocompleteResponse {
            suggestions,
            total_considered,
        })
    }
}

/// Ranking terms from the raw query: normalized words, operator characters
/// and all. Ranking tolerates operator junk in words — such tokens simply
/// match nothing.
fn query_terms(raw_query: &str) -> QueryTerms {
    QueryTerms::new(&query_words(&normalize(raw_query)))
}
