//! Response types handed to the HTTP layer.
//!
//! These are the JSON-facing shapes: base catalog fields only, none of the
//! transient ranking state ever appears here.

use serde::Serialize;

use crate::candidate::Candidate;

/// One ranked search result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TitleHit {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub poster_url: Option<String>,
    pub rating: f64,
    pub views: i64,
    pub release_year: i32,
}

impl From<&Candidate> for TitleHit {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.id,
            title: c.title().to_string(),
            original_title: c.original_title().map(str::to_string),
            poster_url: c.poster_url.clone(),
            rating: c.rating,
            views: c.views,
            release_year: c.release_year,
        }
    }
}

/// Full search result: ordered hits plus the match count before truncation.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchResponse {
    pub hits: Vec<TitleHit>,
    pub total: usize,
}

/// One autocomplete suggestion. `title` carries `<mark>` highlight markers;
/// the raw fields stay untouched for the client's fallback rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub poster_url: Option<String>,
    pub release_year: i32,
}

/// Autocomplete result: highlighted, truncated suggestions plus how many
/// candidates the ranking pass considered.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<Suggestion>,
    pub total_considered: usize,
}

/// Catalog entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleKind {
    Movie,
    Series,
}

impl TitleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TitleKind::Movie => "movie",
            TitleKind::Series => "series",
        }
    }
}

/// Sort field for browse listings. When a search term is present, fulltext
/// relevance ranks ahead of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Rating,
    Views,
    ReleaseYear,
    Title,
}

impl SortField {
    /// Column plus direction for the ORDER BY clause. Columns are qualified
    /// because the listing query may join the fulltext table, which carries
    /// a `title` column of its own.
    pub(crate) fn order_sql(self) -> &'static str {
        match self {
            SortField::Rating => "t.rating DESC",
            SortField::Views => "t.views DESC",
            SortField::ReleaseYear => "t.release_year DESC",
            SortField::Title => "t.title ASC",
        }
    }
}

/// Browse/filter request: every field optional, blended into one listing
/// query by the store.
#[derive(Debug, Clone, Default)]
pub struct BrowseFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub kind: Option<TitleKind>,
    pub release_year: Option<i32>,
    pub min_rating: Option<f64>,
    pub sort: SortField,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_hit_from_candidate_carries_base_fields_only() {
        let c = Candidate::new(
            7,
            "Người Nhện".into(),
            Some("Spider-Man".into()),
            Some("/posters/7.jpg".into()),
            7.9,
            123_456,
            2021,
        );
        // Touch the derived variants so the caches are warm, then convert;
        // the hit must expose only base fields.
        let _ = c.title_lower_unaccented();
        let hit = TitleHit::from(&c);
        let json = serde_json::to_value(&hit).unwrap();
        // serde_json orders object keys alphabetically
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "original_title",
                "poster_url",
                "rating",
                "release_year",
                "title",
                "views"
            ]
        );
        assert_eq!(json["title"], "Người Nhện");
        assert_eq!(json["original_title"], "Spider-Man");
    }

    #[test]
    fn test_sort_field_order_sql() {
        assert_eq!(SortField::Rating.order_sql(), "t.rating DESC");
        assert_eq!(SortField::Title.order_sql(), "t.title ASC");
    }
}
