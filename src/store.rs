//! SQLite catalog storage and the candidate-fetch boundary.
//!
//! The ranking engine only requires two queries from storage: a boolean
//! fulltext search over titles and a normalized-prefix fallback scan. The
//! [`CandidateFetcher`] trait captures that contract; [`SqliteCatalog`] is
//! the embedded implementation, using r2d2 connection pooling so concurrent
//! requests read without mutex blocking.
//!
//! The FTS5 index uses `unicode61 remove_diacritics 2`, so indexed titles
//! and query tokens are both matched accent-insensitively.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use std::path::Path;
use thiserror::Error;

use crate::candidate::Candidate;
use crate::models::{BrowseFilter, TitleKind};
use crate::normalize::{normalize, strip_diacritics};
use crate::query::{build_directive, SearchDirective, SearchMode};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The two queries the ranking engine requires from storage.
///
/// Implementations return only active/published rows. Errors propagate to
/// the orchestration layer untouched — the engine performs no retries.
pub trait CandidateFetcher {
    /// Boolean fulltext search over title columns with the given directive.
    fn fulltext_search(
        &self,
        directive: &SearchDirective,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Candidate>>;

    /// Accent/case-insensitive prefix match over the stored normalized
    /// title, ordered by rating then views. Used only when the fulltext
    /// search yields zero rows.
    fn prefix_search(&self, prefix: &str, limit: Option<usize>) -> StoreResult<Vec<Candidate>>;
}

/// A title to insert into the catalog. `title_search` is derived on write.
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub title: String,
    pub original_title: Option<String>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub kind: TitleKind,
    pub rating: f64,
    pub views: i64,
    pub release_year: i32,
    pub published: bool,
}

impl Default for NewTitle {
    fn default() -> Self {
        Self {
            title: String::new(),
            original_title: None,
            poster_url: None,
            genre: None,
            kind: TitleKind::Movie,
            rating: 0.0,
            views: 0,
            release_year: 0,
            published: true,
        }
    }
}

const CANDIDATE_COLUMNS: &str =
    "t.id, t.title, t.original_title, t.poster_url, t.rating, t.views, t.release_year";

/// Thread-safe catalog store backed by SQLite.
///
/// Uses an r2d2 connection pool; WAL mode lets readers proceed without
/// blocking each other. The FTS5 index over (title, original_title) is
/// external-content and kept in sync by triggers.
pub struct SqliteCatalog {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteCatalog {
    /// Open or create a catalog database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
                PRAGMA cache_size=-32000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let catalog = Self { pool };
        catalog.setup_schema()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        // In-memory needs a single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let catalog = Self { pool };
        catalog.setup_schema()?;
        Ok(catalog)
    }

    fn get_conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS titles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                original_title TEXT,
                title_search TEXT NOT NULL,
                poster_url TEXT,
                genre TEXT,
                kind TEXT NOT NULL DEFAULT 'movie',
                rating REAL NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                release_year INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'published'
            );

            CREATE INDEX IF NOT EXISTS idx_titles_status ON titles(status);
            CREATE INDEX IF NOT EXISTS idx_titles_search_prefix ON titles(title_search);

            CREATE VIRTUAL TABLE IF NOT EXISTS titles_fts USING fts5(
                title, original_title,
                content='titles', content_rowid='id',
                tokenize='unicode61 remove_diacritics 2'
            );

            CREATE TRIGGER IF NOT EXISTS titles_fts_insert AFTER INSERT ON titles BEGIN
                INSERT INTO titles_fts(rowid, title, original_title)
                VALUES (new.id, new.title, new.original_title);
            END;

            CREATE TRIGGER IF NOT EXISTS titles_fts_delete AFTER DELETE ON titles BEGIN
                INSERT INTO titles_fts(titles_fts, rowid, title, original_title)
                VALUES ('delete', old.id, old.title, old.original_title);
            END;

            CREATE TRIGGER IF NOT EXISTS titles_fts_update AFTER UPDATE ON titles BEGIN
                INSERT INTO titles_fts(titles_fts, rowid, title, original_title)
                VALUES ('delete', old.id, old.title, old.original_title);
                INSERT INTO titles_fts(rowid, title, original_title)
                VALUES (new.id, new.title, new.original_title);
            END;
        "#,
        )?;
        Ok(())
    }

    /// Insert a title, deriving the stored normalized form on write.
    /// Returns the new row id.
    pub fn insert_title(&self, new: &NewTitle) -> StoreResult<i64> {
        let conn = self.get_conn()?;
        let title_search = strip_diacritics(&normalize(&new.title));
        let status = if new.published { "published" } else { "draft" };
        conn.execute(
            "INSERT INTO titles
                (title, original_title, title_search, poster_url, genre, kind,
                 rating, views, release_year, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.title,
                new.original_title,
                title_search,
                new.poster_url,
                new.genre,
                new.kind.as_str(),
                new.rating,
                new.views,
                new.release_year,
                status,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Browse/filter listing: optional search term blended with the other
    /// filters. With a search term present, fulltext relevance is the
    /// primary sort key ahead of the caller's sort field.
    pub fn browse(&self, filter: &BrowseFilter) -> StoreResult<Vec<Candidate>> {
        let mut sql = format!("SELECT {CANDIDATE_COLUMNS} FROM titles t");
        let mut clauses: Vec<&str> = vec!["t.status = 'published'"];
        let mut values: Vec<Value> = Vec::new();
        let mut order = filter.sort.order_sql().to_string();

        let directive = filter.search.as_deref().and_then(build_directive);
        if let Some(directive) = &directive {
            sql.push_str(" JOIN titles_fts ON titles_fts.rowid = t.id");
            clauses.push("titles_fts MATCH ?");
            values.push(Value::Text(fts_match_expr(directive)));
            order = format!("titles_fts.rank, {order}");
        }
        if let Some(genre) = &filter.genre {
            clauses.push("t.genre LIKE '%' || ? || '%'");
            values.push(Value::Text(genre.clone()));
        }
        if let Some(kind) = filter.kind {
            clauses.push("t.kind = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(year) = filter.release_year {
            clauses.push("t.release_year = ?");
            values.push(Value::Integer(year as i64));
        }
        if let Some(min_rating) = filter.min_rating {
            clauses.push("t.rating >= ?");
            values.push(Value::Real(min_rating));
        }

        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(sql_limit(filter.limit)));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), row_to_candidate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl CandidateFetcher for SqliteCatalog {
    fn fulltext_search(
        &self,
        directive: &SearchDirective,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Candidate>> {
        let expr = fts_match_expr(directive);
        log::debug!("fts match expression: {expr}");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS}
             FROM titles_fts JOIN titles t ON t.id = titles_fts.rowid
             WHERE titles_fts MATCH ?1 AND t.status = 'published'
             ORDER BY titles_fts.rank
             LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![expr, sql_limit(limit)], row_to_candidate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn prefix_search(&self, prefix: &str, limit: Option<usize>) -> StoreResult<Vec<Candidate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS}
             FROM titles t
             WHERE t.status = 'published' AND t.title_search LIKE ?1 || '%' ESCAPE '\\'
             ORDER BY t.rating DESC, t.views DESC
             LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![escape_like(prefix), sql_limit(limit)], row_to_candidate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// SQLite treats LIMIT -1 as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| l as i64)
}

/// Escape LIKE pattern metacharacters in a literal prefix.
fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Translate a search directive into an FTS5 MATCH expression.
///
/// Wildcard directives are engine-built: `+tok` becomes a quoted required
/// term (FTS5 terms are implicitly AND), `tok*` a quoted prefix term.
/// Passthrough directives go to MATCH verbatim under the "caller already
/// knows the syntax" contract; a malformed expression surfaces as a store
/// error.
fn fts_match_expr(directive: &SearchDirective) -> String {
    match directive.mode {
        SearchMode::BooleanPassthrough => directive.query.clone(),
        SearchMode::BooleanWildcard => directive
            .query
            .split_whitespace()
            .map(|term| {
                if let Some(t) = term.strip_prefix('+') {
                    format!("\"{}\"", fts_quote(t))
                } else if let Some(t) = term.strip_suffix('*') {
                    format!("\"{}\"*", fts_quote(t))
                } else {
                    format!("\"{}\"", fts_quote(term))
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// FTS5 escapes a double quote inside a quoted term by doubling it.
fn fts_quote(term: &str) -> String {
    term.replace('"', "\"\"")
}

/// Map a candidate row, coercing missing numeric fields to neutral defaults.
fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate::new(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        row.get::<_, Option<i64>>(5)?.unwrap_or(0).max(0),
        row.get::<_, Option<i32>>(6)?.unwrap_or(0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortField;
    use crate::query::build_directive;

    fn seeded_catalog() -> SqliteCatalog {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let titles = [
            NewTitle {
                title: "Avatar: The Way of Water".into(),
                original_title: Some("Avatar: The Way of Water".into()),
                genre: Some("Action, Adventure".into()),
                rating: 7.6,
                views: 500_000,
                release_year: 2022,
                ..Default::default()
            },
            NewTitle {
                title: "Người Nhện: Không Còn Nhà".into(),
                original_title: Some("Spider-Man: No Way Home".into()),
                genre: Some("Action".into()),
                rating: 8.2,
                views: 900_000,
                release_year: 2021,
                ..Default::default()
            },
            NewTitle {
                title: "Wednesday".into(),
                original_title: Some("Wednesday".into()),
                genre: Some("Comedy, Horror".into()),
                kind: TitleKind::Series,
                rating: 8.1,
                views: 200_000,
                release_year: 2022,
                ..Default::default()
            },
            NewTitle {
                title: "Nhà Bà Nữ".into(),
                genre: Some("Drama".into()),
                rating: 6.8,
                views: 150_000,
                release_year: 2023,
                ..Default::default()
            },
            NewTitle {
                title: "Avatar Hậu Trường".into(),
                published: false,
                ..Default::default()
            },
        ];
        for t in &titles {
            catalog.insert_title(t).unwrap();
        }
        catalog
    }

    fn titles_of(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.title()).collect()
    }

    #[test]
    fn test_fulltext_wildcard_match() {
        let catalog = seeded_catalog();
        let d = build_directive("avatar").unwrap();
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(titles_of(&found), vec!["Avatar: The Way of Water"]);
    }

    #[test]
    fn test_fulltext_accent_insensitive() {
        let catalog = seeded_catalog();
        // Unaccented query tokens match the accented stored title
        let d = build_directive("nguoi nhen").unwrap();
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(titles_of(&found), vec!["Người Nhện: Không Còn Nhà"]);
    }

    #[test]
    fn test_fulltext_matches_original_title() {
        let catalog = seeded_catalog();
        let d = build_directive("spider").unwrap();
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(titles_of(&found), vec!["Người Nhện: Không Còn Nhà"]);
    }

    #[test]
    fn test_fulltext_required_short_term() {
        let catalog = seeded_catalog();
        // "nhà" is 3 chars so it gets a wildcard; "bà" stays exact
        let d = build_directive("bà nhà").unwrap();
        assert_eq!(d.query, "+bà nhà*");
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(titles_of(&found), vec!["Nhà Bà Nữ"]);
    }

    #[test]
    fn test_fulltext_excludes_unpublished() {
        let catalog = seeded_catalog();
        let d = build_directive("hậu trường").unwrap();
        assert!(catalog.fulltext_search(&d, None).unwrap().is_empty());
    }

    #[test]
    fn test_fulltext_passthrough_valid_syntax() {
        let catalog = seeded_catalog();
        // Quotes trigger passthrough and are valid FTS5 syntax as-is
        let d = build_directive("\"wednesday\"").unwrap();
        assert_eq!(d.mode, SearchMode::BooleanPassthrough);
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(titles_of(&found), vec!["Wednesday"]);
    }

    #[test]
    fn test_fulltext_passthrough_malformed_syntax_errors() {
        let catalog = seeded_catalog();
        // An unbalanced paren is the caller's problem; the error propagates
        let d = build_directive("avatar (").unwrap();
        assert_eq!(d.mode, SearchMode::BooleanPassthrough);
        assert!(catalog.fulltext_search(&d, None).is_err());
    }

    #[test]
    fn test_fulltext_limit() {
        let catalog = seeded_catalog();
        let d = build_directive("nhà").unwrap();
        let found = catalog.fulltext_search(&d, Some(1)).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_prefix_search_ordering_and_filtering() {
        let catalog = seeded_catalog();
        // Both "Người Nhện..." (nguoi...) and "Nhà Bà Nữ" (nha ba nu) start
        // with "n"; higher rating first
        let found = catalog.prefix_search("n", None).unwrap();
        assert_eq!(
            titles_of(&found),
            vec!["Người Nhện: Không Còn Nhà", "Nhà Bà Nữ"]
        );
    }

    #[test]
    fn test_prefix_search_uses_normalized_title() {
        let catalog = seeded_catalog();
        let found = catalog.prefix_search("nguoi nhen", None).unwrap();
        assert_eq!(titles_of(&found), vec!["Người Nhện: Không Còn Nhà"]);
    }

    #[test]
    fn test_prefix_search_like_metacharacters_literal() {
        let catalog = seeded_catalog();
        // "%" must not act as a wildcard
        assert!(catalog.prefix_search("%", None).unwrap().is_empty());
    }

    #[test]
    fn test_row_coercion_of_null_numerics() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let conn = catalog.get_conn().unwrap();
        conn.execute(
            "INSERT INTO titles (title, title_search, rating, views, release_year)
             VALUES ('Broken', 'broken', NULL, NULL, NULL)",
            [],
        )
        .unwrap();
        drop(conn);
        let d = build_directive("broken").unwrap();
        let found = catalog.fulltext_search(&d, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rating, 0.0);
        assert_eq!(found[0].views, 0);
        assert_eq!(found[0].release_year, 0);
    }

    #[test]
    fn test_browse_filters_blend() {
        let catalog = seeded_catalog();
        let filter = BrowseFilter {
            genre: Some("Action".into()),
            min_rating: Some(8.0),
            ..Default::default()
        };
        let found = catalog.browse(&filter).unwrap();
        assert_eq!(titles_of(&found), vec!["Người Nhện: Không Còn Nhà"]);
    }

    #[test]
    fn test_browse_kind_and_year() {
        let catalog = seeded_catalog();
        let filter = BrowseFilter {
            kind: Some(TitleKind::Series),
            release_year: Some(2022),
            ..Default::default()
        };
        let found = catalog.browse(&filter).unwrap();
        assert_eq!(titles_of(&found), vec!["Wednesday"]);
    }

    #[test]
    fn test_browse_search_term_sorts_by_fts_rank_first() {
        let catalog = seeded_catalog();
        // Sorting by views would put Spider-Man first; the search term makes
        // FTS relevance the primary key, so only matching rows appear and
        // relevance decides their order
        let filter = BrowseFilter {
            search: Some("avatar".into()),
            sort: SortField::Views,
            ..Default::default()
        };
        let found = catalog.browse(&filter).unwrap();
        assert_eq!(titles_of(&found), vec!["Avatar: The Way of Water"]);
    }

    #[test]
    fn test_browse_default_sort_rating_desc() {
        let catalog = seeded_catalog();
        let found = catalog.browse(&BrowseFilter::default()).unwrap();
        assert_eq!(
            titles_of(&found),
            vec![
                "Người Nhện: Không Còn Nhà",
                "Wednesday",
                "Avatar: The Way of Water",
                "Nhà Bà Nữ"
            ]
        );
    }

    #[test]
    fn test_browse_limit() {
        let catalog = seeded_catalog();
        let filter = BrowseFilter {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(catalog.browse(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_fts_match_expr_translation() {
        let d = build_directive("em bé avatar").unwrap();
        assert_eq!(fts_match_expr(&d), "\"em\" \"bé\" \"avatar\"*");
    }

    #[test]
    fn test_update_keeps_fts_in_sync() {
        let catalog = seeded_catalog();
        let conn = catalog.get_conn().unwrap();
        conn.execute(
            "UPDATE titles SET title = 'Avatar Renamed' WHERE title LIKE 'Avatar:%'",
            [],
        )
        .unwrap();
        drop(conn);
        let found = catalog
            .fulltext_search(&build_directive("renamed").unwrap(), None)
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
