//! Prefix classification, heuristic scoring, and composite-key ranking.
//!
//! Implements a lexicographic key where higher-priority signals always
//! dominate lower ones: a full-query prefix match ALWAYS beats a first-word
//! match, more matched query words ALWAYS beat a higher heuristic score, etc.
//! The heuristic score only separates candidates inside the same prefix/word
//! bucket; rating and views break the final ties.
//!
//! Every comparison runs over three title variants — primary lowercased,
//! primary lowercased + diacritic-stripped, alternate lowercased — so "nguoi
//! nhen" finds "Người Nhện" and "spider" finds the English title.

use std::cmp::Ordering;

use crate::candidate::Candidate;
use crate::normalize::strip_diacritics;

/// Points for a title starting with the full joined query.
const FULL_QUERY_START_BONUS: f64 = 1000.0;
/// Points for a title starting with the first query word.
const FIRST_WORD_START_BONUS: f64 = 500.0;
/// Points for a title starting with any later query word.
const OTHER_WORD_START_BONUS: f64 = 300.0;
/// Extra points when the query equals the title exactly.
const EXACT_MATCH_BONUS: f64 = 200.0;
/// Points when every query word appears somewhere in the title.
const FULL_COVERAGE_BONUS: f64 = 100.0;
/// Points per query word found when coverage is partial.
const PARTIAL_COVERAGE_BONUS: f64 = 30.0;
/// Minimum rating before the rating boost applies.
const RATING_BOOST_THRESHOLD: f64 = 7.0;
const RATING_BOOST_FACTOR: f64 = 5.0;
/// Views contribute 1 point per thousand, capped.
const VIEWS_BOOST_CAP: f64 = 50.0;
/// Titles from this year onward get a recency boost.
const RECENCY_YEAR_FLOOR: i32 = 2020;
const RECENCY_BOOST_PER_YEAR: f64 = 3.0;

/// One query word with its diacritic-stripped form, both lowercased.
#[derive(Debug, Clone)]
struct QueryWord {
    lower: String,
    unaccented: String,
}

/// A query's words prepared for matching: lowercased, diacritic-stripped,
/// and pre-joined. Built once per request and shared by the classifier,
/// scorer and ranker. Word order is preserved — it decides "first word"
/// versus "other word" semantics.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    words: Vec<QueryWord>,
    full: String,
    full_unaccented: String,
}

impl QueryTerms {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let words: Vec<QueryWord> = words
            .iter()
            .map(|w| {
                let lower = w.as_ref().to_lowercase();
                let unaccented = strip_diacritics(&lower);
                QueryWord { lower, unaccented }
            })
            .collect();
        let full = words
            .iter()
            .map(|w| w.lower.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let full_unaccented = words
            .iter()
            .map(|w| w.unaccented.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            words,
            full,
            full_unaccented,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Lowercased words in query order, for keyword highlighting.
    pub fn lowered_words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|w| w.lower.as_str())
    }
}

/// Per-candidate priority flags attached transiently during ranking.
///
/// `full_prefix` short-circuits the others — the three flags are mutually
/// exclusive. `matched_word_count` counts substring containment (not prefix)
/// and is computed regardless of the flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefixFlags {
    pub full_prefix: bool,
    pub first_prefix: bool,
    pub other_prefix: bool,
    pub matched_word_count: u32,
}

/// Whether any title variant starts with the compared string.
fn title_starts_with(candidate: &Candidate, lower: &str, unaccented: &str) -> bool {
    candidate.title_lower().starts_with(lower)
        || candidate.title_lower_unaccented().starts_with(unaccented)
        || candidate.original_lower().starts_with(lower)
}

/// Whether a query word appears anywhere in any title variant.
fn word_in_title(candidate: &Candidate, word: &QueryWord) -> bool {
    candidate.title_lower().contains(&word.lower)
        || candidate
            .title_lower_unaccented()
            .contains(&word.unaccented)
        || candidate.original_lower().contains(&word.lower)
}

/// Classify a candidate's prefix-match priority against the query words.
pub fn classify(candidate: &Candidate, terms: &QueryTerms) -> PrefixFlags {
    let mut flags = PrefixFlags::default();

    if !terms.full.is_empty() && title_starts_with(candidate, &terms.full, &terms.full_unaccented)
    {
        flags.full_prefix = true;
    } else if let Some(first) = terms.words.first() {
        if title_starts_with(candidate, &first.lower, &first.unaccented) {
            flags.first_prefix = true;
        } else {
            for word in &terms.words[1..] {
                if title_starts_with(candidate, &word.lower, &word.unaccented) {
                    flags.other_prefix = true;
                    break;
                }
            }
        }
    }

    flags.matched_word_count = terms
        .words
        .iter()
        .filter(|w| word_in_title(candidate, w))
        .count() as u32;

    flags
}

/// Earliest char index of `needle` in `haystack`, if present.
/// Char-based so position buckets mean the same thing for multibyte titles.
fn char_find(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .find(needle)
        .map(|byte_idx| haystack[..byte_idx].chars().count())
}

/// Position bonus for one query word: earliest occurrence across the three
/// title variants, bucketed by how close to the title start it lands.
fn position_bonus(candidate: &Candidate, word: &QueryWord) -> f64 {
    let earliest = [
        char_find(candidate.title_lower(), &word.lower),
        char_find(candidate.title_lower_unaccented(), &word.unaccented),
        char_find(candidate.original_lower(), &word.lower),
    ]
    .into_iter()
    .flatten()
    .min();

    match earliest {
        Some(0) => 50.0,
        Some(idx) if idx <= 5 => 30.0,
        Some(idx) if idx <= 10 => 15.0,
        _ => 0.0,
    }
}

/// Heuristic relevance score: additive points from text match quality,
/// rating, views and recency. Only meaningful as a same-query ranking key —
/// scores from different queries are not comparable.
pub fn relevance_score(candidate: &Candidate, terms: &QueryTerms) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    // Title-start bonuses are mutually exclusive: only the highest-priority
    // one fires, same test family as the classifier.
    if title_starts_with(candidate, &terms.full, &terms.full_unaccented) {
        score += FULL_QUERY_START_BONUS;
    } else if let Some(first) = terms.words.first() {
        if title_starts_with(candidate, &first.lower, &first.unaccented) {
            score += FIRST_WORD_START_BONUS;
        } else if terms.words[1..]
            .iter()
            .any(|w| title_starts_with(candidate, &w.lower, &w.unaccented))
        {
            score += OTHER_WORD_START_BONUS;
        }
    }

    if terms.full == candidate.title_lower()
        || terms.full_unaccented == candidate.title_lower_unaccented()
        || terms.full == candidate.original_lower()
    {
        score += EXACT_MATCH_BONUS;
    }

    let words_in_title = terms
        .words
        .iter()
        .filter(|w| word_in_title(candidate, w))
        .count();
    if words_in_title == terms.words.len() {
        score += FULL_COVERAGE_BONUS;
    } else {
        score += PARTIAL_COVERAGE_BONUS * words_in_title as f64;
    }

    for word in &terms.words {
        score += position_bonus(candidate, word);
    }

    if candidate.rating >= RATING_BOOST_THRESHOLD {
        score += candidate.rating * RATING_BOOST_FACTOR;
    }

    score += (candidate.views.max(0) as f64 / 1000.0).min(VIEWS_BOOST_CAP);

    if candidate.release_year >= RECENCY_YEAR_FLOOR {
        score += (candidate.release_year - (RECENCY_YEAR_FLOOR - 1)) as f64
            * RECENCY_BOOST_PER_YEAR;
    }

    score
}

/// Composite ranking key — manual `Ord` gives lexicographic comparison,
/// higher = better on every component. Prefix-match category dominates all
/// else; matched word count beats the heuristic score; rating then views
/// break remaining ties.
#[derive(Debug, Clone, Copy)]
pub struct RankKey {
    pub full_prefix: bool,
    pub first_prefix: bool,
    pub other_prefix: bool,
    pub matched_word_count: u32,
    pub score: f64,
    pub rating: f64,
    pub views: i64,
}

impl RankKey {
    pub fn compute(candidate: &Candidate, terms: &QueryTerms) -> Self {
        let flags = classify(candidate, terms);
        Self {
            full_prefix: flags.full_prefix,
            first_prefix: flags.first_prefix,
            other_prefix: flags.other_prefix,
            matched_word_count: flags.matched_word_count,
            score: relevance_score(candidate, terms),
            rating: candidate.rating,
            views: candidate.views,
        }
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_prefix
            .cmp(&other.full_prefix)
            .then_with(|| self.first_prefix.cmp(&other.first_prefix))
            .then_with(|| self.other_prefix.cmp(&other.other_prefix))
            .then_with(|| self.matched_word_count.cmp(&other.matched_word_count))
            .then_with(|| self.score.total_cmp(&other.score))
            .then_with(|| self.rating.total_cmp(&other.rating))
            .then_with(|| self.views.cmp(&other.views))
    }
}

/// Sort candidates by descending [`RankKey`]. Stable: fully tied candidates
/// keep their input order, so identical inputs always rank identically.
/// Keys live only inside this function — output candidates carry no scoring
/// state.
pub fn rank(candidates: Vec<Candidate>, terms: &QueryTerms) -> Vec<Candidate> {
    let mut keyed: Vec<(RankKey, Candidate)> = candidates
        .into_iter()
        .map(|c| (RankKey::compute(&c, terms), c))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, c)| c).collect()
}
