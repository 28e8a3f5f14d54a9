//! Catalog Search - relevance ranking engine for a bilingual streaming catalog
//!
//! This library implements search, autocomplete and browse over a movie/series
//! catalog with Vietnamese and English titles: SQLite FTS5 retrieval with
//! accent-insensitive tokenization, then composite-key re-ranking where
//! prefix-match category dominates matched word count, which dominates the
//! additive heuristic score.

pub mod candidate;
pub mod highlight;
pub mod models;
pub mod normalize;
pub mod query;
pub mod ranking;
pub mod search;
pub mod store;

pub use candidate::Candidate;
pub use models::{
    AutocompleteResponse, BrowseFilter, SearchResponse, SortField, Suggestion, TitleHit,
    TitleKind,
};
pub use query::{build_directive, SearchDirective, SearchMode};
pub use search::SearchEngine;
pub use store::{CandidateFetcher, NewTitle, SqliteCatalog, StoreError, StoreResult};
