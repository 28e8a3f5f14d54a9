//! Catalog candidate with memoized derived state.
//!
//! Module isolation ensures no code outside this module can mutate the title
//! fields after construction, so the `OnceLock` caches can never go stale.

use std::sync::OnceLock;

use crate::normalize::strip_diacritics;

/// A catalog title under consideration for one request's results.
///
/// The lowercased and diacritic-stripped title variants are computed on first
/// access and cached, so the classifier, scorer and ranker share one pass of
/// derived state instead of recomputing it per signal. The caches are private
/// and never appear in output types.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: i64,
    title: String,
    original_title: Option<String>,
    pub poster_url: Option<String>,
    pub rating: f64,
    pub views: i64,
    pub release_year: i32,
    title_lower: OnceLock<String>,
    title_lower_unaccented: OnceLock<String>,
    original_lower: OnceLock<String>,
}

impl Candidate {
    pub fn new(
        id: i64,
        title: String,
        original_title: Option<String>,
        poster_url: Option<String>,
        rating: f64,
        views: i64,
        release_year: i32,
    ) -> Self {
        Self {
            id,
            title,
            original_title,
            poster_url,
            rating,
            views,
            release_year,
            title_lower: OnceLock::new(),
            title_lower_unaccented: OnceLock::new(),
            original_lower: OnceLock::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn original_title(&self) -> Option<&str> {
        self.original_title.as_deref()
    }

    /// Primary title, lowercased.
    pub fn title_lower(&self) -> &str {
        self.title_lower.get_or_init(|| self.title.to_lowercase())
    }

    /// Primary title, lowercased and diacritic-stripped.
    pub fn title_lower_unaccented(&self) -> &str {
        self.title_lower_unaccented
            .get_or_init(|| strip_diacritics(self.title_lower()))
    }

    /// Alternate title, lowercased. Empty string when absent — every
    /// comparison against it then fails naturally.
    pub fn original_lower(&self) -> &str {
        self.original_lower.get_or_init(|| {
            self.original_title
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
        })
    }
}
