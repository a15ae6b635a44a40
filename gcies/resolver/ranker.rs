//! Lexical disambiguation of place candidates.
//!
//! Scores only look at the short description, the title, the extract snippet
//! and the presence of coordinates. There is no administrative hierarchy
//! behind them, so results are best effort.

use crate::{
    candidate::{Candidate, ScoredCandidate},
    query::{normalize_term, Query},
};

/// Description words marking a populated place.
pub const SETTLEMENT_KEYWORDS: [&str; 6] = [
    "town",
    "city",
    "village",
    "municipality",
    "settlement",
    "capital",
];

/// Description words marking a broader administrative or geographic unit.
pub const ADMINISTRATIVE_KEYWORDS: [&str; 6] = [
    "district",
    "state",
    "country",
    "neighborhood",
    "territory",
    "island",
];

/// Words marking an electoral district rather than a place.
pub const ELECTORAL_MARKERS: [&str; 2] = ["constituency", "electoral"];

/// Bonus for a settlement keyword in the description.
pub const SETTLEMENT_BONUS: i64 = 50;
/// Bonus for an administrative keyword, when no settlement keyword matched.
pub const ADMINISTRATIVE_BONUS: i64 = 20;
/// Penalty for electoral-district wording.
pub const ELECTORAL_PENALTY: i64 = 30;
/// Bonus for candidates carrying coordinates.
pub const COORDINATES_BONUS: i64 = 10;
/// Bonus per matching context term; outweighs every other signal combined.
pub const CONTEXT_MATCH_BONUS: i64 = 200;

/// Scores one candidate against a query. Pure and deterministic.
#[must_use]
pub fn score_candidate(query: &Query, candidate: &Candidate) -> i64 {
    let description = candidate.short_description.to_lowercase();
    let title = candidate.title.to_lowercase();
    let mut score = 0;

    if contains_any(&description, &SETTLEMENT_KEYWORDS) {
        score += SETTLEMENT_BONUS;
    } else if contains_any(&description, &ADMINISTRATIVE_KEYWORDS) {
        score += ADMINISTRATIVE_BONUS;
    }

    if contains_any(&description, &ELECTORAL_MARKERS) || contains_any(&title, &ELECTORAL_MARKERS) {
        score -= ELECTORAL_PENALTY;
    }

    if candidate.has_coordinates {
        score += COORDINATES_BONUS;
    }

    if !query.context_terms().is_empty() {
        let fields = [
            normalize_term(&candidate.title),
            normalize_term(&candidate.short_description),
            normalize_term(&candidate.extract_snippet),
        ];
        for term in query.context_terms() {
            if fields.iter().any(|field| field.contains(term.as_str())) {
                score += CONTEXT_MATCH_BONUS;
            }
        }
    }

    score
}

/// Picks the eligible candidate with the strictly highest score.
///
/// Candidates are scanned in source order and a later candidate only replaces
/// the incumbent with a strictly greater score, so ties go to the first seen.
/// Scores of zero or below are never eligible.
#[must_use]
pub fn rank_scored(query: &Query, candidates: &[Candidate]) -> Option<ScoredCandidate> {
    best_eligible(query, candidates).map(|(idx, score)| ScoredCandidate {
        candidate: candidates[idx].clone(),
        score,
    })
}

/// Best candidate, or `None` when nothing is eligible.
#[must_use]
pub fn rank<'a>(query: &Query, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
    best_eligible(query, candidates).map(|(idx, _)| &candidates[idx])
}

/// Index and score of the first candidate holding the strictly highest
/// positive score.
fn best_eligible(query: &Query, candidates: &[Candidate]) -> Option<(usize, i64)> {
    let mut best: Option<(usize, i64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = score_candidate(query, candidate);
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SourceKind;

    fn wiki(title: &str, description: &str) -> Candidate {
        Candidate::new(title, SourceKind::Wikipedia).with_description(description)
    }

    fn query(raw: &str) -> Query {
        Query::parse(raw).unwrap()
    }

    #[test]
    fn settlement_and_administrative_tiers_are_exclusive() {
        let q = query("Springfield");
        assert_eq!(score_candidate(&q, &wiki("A", "City in Illinois")), 50);
        assert_eq!(score_candidate(&q, &wiki("B", "District of Jamaica")), 20);
        assert_eq!(
            score_candidate(&q, &wiki("C", "Capital city of the state")),
            50
        );
        assert_eq!(score_candidate(&q, &wiki("D", "1998 song")), 0);
    }

    #[test]
    fn coordinates_add_ten() {
        let q = query("Springfield");
        let candidate = wiki("Springfield", "town").with_coordinates(true);
        assert_eq!(score_candidate(&q, &candidate), 60);
    }

    #[test]
    fn electoral_candidates_lose_to_plain_towns() {
        let q = query("Springfield");
        let constituency = wiki("Springfield (constituency)", "parliamentary constituency")
            .with_coordinates(true);
        let town = wiki("Springfield, Devon", "town in England");
        let score = score_candidate(&q, &constituency);
        assert!(score <= SETTLEMENT_BONUS - ELECTORAL_PENALTY + COORDINATES_BONUS);
        assert_eq!(score, -20);
        let candidates = vec![constituency, town];
        assert_eq!(rank(&q, &candidates).unwrap().title, "Springfield, Devon");
    }

    #[test]
    fn electoral_title_alone_is_penalized() {
        let q = query("Springfield");
        let candidate = wiki("Springfield Electoral District", "city district");
        assert_eq!(score_candidate(&q, &candidate), 20);
    }

    #[test]
    fn context_match_outranks_better_base() {
        let q = query("Springfield, Illinois");
        let candidates = vec![
            wiki("Springfield, Massachusetts", "City in Massachusetts").with_coordinates(true),
            wiki("Springfield", "City in Illinois, United States"),
        ];
        let best = rank_scored(&q, &candidates).unwrap();
        assert_eq!(best.candidate.title, "Springfield");
        assert_eq!(best.score, 250);
    }

    #[test]
    fn context_match_considers_snippet_and_normalizes() {
        let q = query("Springfield, New-York");
        let candidate = wiki("Springfield", "town")
            .with_snippet("Springfield is a town in Otsego County, New York.");
        assert_eq!(score_candidate(&q, &candidate), 250);
    }

    #[test]
    fn each_matching_context_term_adds_bonus() {
        let q = query("Springfield, Sangamon County, Illinois");
        let candidate = wiki("Springfield", "City in Sangamon County, Illinois");
        assert_eq!(score_candidate(&q, &candidate), 50 + 2 * CONTEXT_MATCH_BONUS);
    }

    #[test]
    fn ties_go_to_first_seen() {
        let q = query("Springfield");
        let candidates = vec![
            wiki("First", "town").with_coordinates(true),
            wiki("Second", "village").with_coordinates(true),
        ];
        let best = rank_scored(&q, &candidates).unwrap();
        assert_eq!(best.score, 60);
        assert_eq!(best.candidate.title, "First");
        assert_eq!(rank(&q, &candidates).unwrap().title, "First");
    }

    #[test]
    fn rank_and_rank_scored_pick_the_same_candidate() {
        let q = query("Springfield, Illinois");
        let candidates = vec![
            wiki("Springfield (album)", "album"),
            wiki("Springfield, Oregon", "city").with_coordinates(true),
            wiki("Springfield", "City in Illinois"),
            wiki("Springfield, Illinois (duplicate)", "City in Illinois"),
        ];
        for end in 0..=candidates.len() {
            let slice = &candidates[..end];
            assert_eq!(
                rank(&q, slice).map(|candidate| candidate.title.clone()),
                rank_scored(&q, slice).map(|best| best.candidate.title),
            );
        }
        assert_eq!(rank(&q, &candidates).unwrap().title, "Springfield");
    }

    #[test]
    fn paris_france_prefers_the_city() {
        let q = query("Paris, France");
        let candidates = vec![
            wiki("Paris (song)", "Song by a band from the capital").with_coordinates(true),
            wiki("Paris (city, France)", "Capital of France"),
        ];
        assert_eq!(rank(&q, &candidates).unwrap().title, "Paris (city, France)");
    }

    #[test]
    fn no_positive_score_means_no_match() {
        let q = query("Springfield");
        let candidates = vec![
            wiki("Springfield (album)", "album"),
            wiki("Springfield (constituency)", "electoral district"),
        ];
        assert!(rank(&q, &candidates).is_none());
        assert!(rank_scored(&q, &[]).is_none());
    }
}
