use crate::scraper::{
    Result, ScraperError,
    types::{Candidate, MediaType},
};
use std::sync::Arc;
use strsim::{jaro_winkler, normalized_levenshtein};

/// Match confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// No match
    None = 0,
    /// Low confidence - might be wrong
    Low = 1,
    /// Medium confidence - likely correct
    Medium = 2,
    /// High confidence - almost certainly correct
    High = 3,
    /// Exact match
    Exact = 4,
}

impl Confidence {
    fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.999 => Self::Exact,
            s if s >= 0.9 => Self::High,
            s if s >= 0.75 => Self::Medium,
            s if s >= 0.5 => Self::Low,
            _ => Self::None,
        }
    }
}

/// A scored match result
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    /// The matched candidate
    pub candidate: Candidate,
    /// Similarity score (0.0-1.0)
    pub score: f64,
    /// Confidence level
    pub confidence: Confidence,
}

/// Matcher for scoring and ranking search results
pub struct Matcher;

impl Matcher {
    /// Jaro-Winkler share of the blended score
    const JARO_WEIGHT: f64 = 0.6;

    /// Score and rank candidates against a `Title (Year)` query.
    ///
    /// The sort is stable so equal scores keep the order the catalog returned.
    #[must_use]
    pub fn rank(query: &str, candidates: Vec<Candidate>) -> Vec<ScoredMatch> {
        let query = Self::normalize_title(query);
        let mut scored: Vec<ScoredMatch> = candidates
            .into_iter()
            .map(|candidate| {
                let score =
                    Self::string_similarity(&query, &Self::normalize_title(&candidate.display_title()));
                ScoredMatch {
                    candidate,
                    score,
                    confidence: Confidence::from_score(score),
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        scored
    }

    /// Highest scoring candidate
    #[must_use]
    pub fn best_match(query: &str, candidates: Vec<Candidate>) -> Option<ScoredMatch> {
        Self::rank(query, candidates).into_iter().next()
    }

    fn normalize_title(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn string_similarity(a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        Self::JARO_WEIGHT * jaro_winkler(a, b)
            + (1.0 - Self::JARO_WEIGHT) * normalized_levenshtein(a, b)
    }
}

/// Outcome of an external candidate selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the offered candidates
    Chosen(usize),
    /// Stop processing the current file
    Abort,
}

/// External policy choosing among search results (e.g., an interactive prompt)
pub trait CandidateSelector: Send + Sync {
    fn select(&self, candidates: &[Candidate], media_type: MediaType) -> Selection;
}

/// How a provider picks one candidate out of several search results
#[derive(Clone, Default)]
pub enum Disambiguation {
    /// Highest fuzzy similarity wins
    #[default]
    BestMatch,
    /// Defer to a selector
    Select(Arc<dyn CandidateSelector>),
}

impl std::fmt::Debug for Disambiguation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestMatch => f.write_str("BestMatch"),
            Self::Select(_) => f.write_str("Select(..)"),
        }
    }
}

impl Disambiguation {
    /// Pick one candidate. `Ok(None)` when there is nothing to choose from,
    /// [`ScraperError::Aborted`] when the selector asked to stop.
    pub fn choose(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        media_type: MediaType,
    ) -> Result<Option<Candidate>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let ranked = Matcher::rank(query, candidates);
        match self {
            Self::BestMatch => Ok(ranked.into_iter().next().map(|best| {
                tracing::debug!(
                    "Best match for '{}': {} (score {:.3}, {:?})",
                    query,
                    best.candidate.display_title(),
                    best.score,
                    best.confidence
                );
                best.candidate
            })),
            Self::Select(selector) => {
                let mut offered: Vec<Candidate> =
                    ranked.into_iter().map(|m| m.candidate).collect();
                match selector.select(&offered, media_type) {
                    Selection::Chosen(index) if index < offered.len() => {
                        Ok(Some(offered.swap_remove(index)))
                    }
                    Selection::Chosen(index) => Err(ScraperError::Parse(format!(
                        "selected candidate {index} out of {}",
                        offered.len()
                    ))),
                    Selection::Abort => Err(ScraperError::Aborted),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, title: &str, year: Option<i32>) -> Candidate {
        Candidate::new(id, title, "test").with_year(year)
    }

    struct Fixed(Selection);

    impl CandidateSelector for Fixed {
        fn select(&self, _candidates: &[Candidate], _media_type: MediaType) -> Selection {
            self.0
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            Matcher::normalize_title("The Matrix (1999)"),
            "the matrix 1999"
        );
    }

    #[test]
    fn test_string_similarity() {
        assert!((Matcher::string_similarity("the matrix", "the matrix") - 1.0).abs() < 0.01);
        assert!(
            Matcher::string_similarity("the matrix", "the matrix reloaded")
                > Matcher::string_similarity("the matrix", "inception")
        );
    }

    #[test]
    fn test_year_breaks_title_tie() {
        let ranked = Matcher::rank(
            "The Matrix (1999)",
            vec![
                candidate("2", "The Matrix", Some(2021)),
                candidate("1", "The Matrix", Some(1999)),
            ],
        );

        assert_eq!(ranked[0].candidate.id, "1");
        assert_eq!(ranked[0].confidence, Confidence::Exact);
    }

    #[test]
    fn test_ties_keep_result_order() {
        let candidates = vec![
            candidate("a", "Show Name", None),
            candidate("b", "Show Name", None),
        ];

        for _ in 0..3 {
            let best = Matcher::best_match("Show Name", candidates.clone()).unwrap();
            assert_eq!(best.candidate.id, "a");
        }
    }

    #[test]
    fn test_selector_overrides_ranking() {
        let strategy = Disambiguation::Select(Arc::new(Fixed(Selection::Chosen(1))));
        let chosen = strategy
            .choose(
                "The Matrix (1999)",
                vec![
                    candidate("1", "The Matrix", Some(1999)),
                    candidate("2", "The Matrix Reloaded", Some(2003)),
                ],
                MediaType::Movie,
            )
            .unwrap()
            .unwrap();

        assert_eq!(chosen.id, "2");
    }

    #[test]
    fn test_selector_abort() {
        let strategy = Disambiguation::Select(Arc::new(Fixed(Selection::Abort)));
        let result = strategy.choose(
            "Anything",
            vec![candidate("1", "Anything", None)],
            MediaType::Movie,
        );

        assert!(matches!(result, Err(ScraperError::Aborted)));
    }

    #[test]
    fn test_no_candidates() {
        let result = Disambiguation::BestMatch
            .choose("Nothing", Vec::new(), MediaType::Movie)
            .unwrap();
        assert!(result.is_none());
    }
}
