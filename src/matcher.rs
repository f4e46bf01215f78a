//! Candidate ranking and confidence assignment.

use crate::cleaner::TitleCleaner;
use crate::models::{CatalogCandidate, MatchResult};
use crate::parser::parse;
use crate::scoring::{Score, Scorer, SimilarityScorer};

/// Default HIGH/LOW boundary.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Picks the best candidate for a raw title.
#[derive(Clone)]
pub struct CandidateMatcher<S: Scorer = SimilarityScorer> {
    scorer: S,
    threshold: f64,
    cleaner: TitleCleaner,
}

impl Default for CandidateMatcher {
    fn default() -> Self {
        Self::new(SimilarityScorer::default(), DEFAULT_THRESHOLD, TitleCleaner::default())
    }
}

impl<S: Scorer> CandidateMatcher<S> {
    pub fn new(scorer: S, threshold: f64, cleaner: TitleCleaner) -> Self {
        Self {
            scorer,
            threshold,
            cleaner,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Score every candidate and keep the best one. Exact ties keep the
    /// earlier candidate.
    pub fn match_title(&self, raw: &str, candidates: &[CatalogCandidate]) -> MatchResult {
        if candidates.is_empty() {
            return MatchResult::not_found();
        }

        let scores = self.candidate_scores(raw, candidates);

        let mut best: Option<(usize, Score)> = None;
        for (idx, score) in scores.into_iter().enumerate() {
            match best {
                Some((_, top)) if score.value <= top.value => {}
                _ => best = Some((idx, score)),
            }
        }

        match best {
            Some((idx, score)) => MatchResult::matched(
                candidates[idx].clone(),
                score.value,
                self.threshold,
                score.strategy,
            ),
            None => MatchResult::not_found(),
        }
    }

    /// Best score per candidate over its renderings: "artist - title" and
    /// the bare title against the cleaned raw title, plus the parsed title
    /// segment against the bare title.
    ///
    /// The parsed artist is not scored on its own: every track by that
    /// artist would tie at 1.0 and the pool could no longer be ranked.
    fn candidate_scores(&self, raw: &str, candidates: &[CatalogCandidate]) -> Vec<Score> {
        let cleaned = self.cleaner.clean(raw);
        let rendered: Vec<String> = candidates.iter().map(CatalogCandidate::rendered).collect();
        let titles: Vec<String> = candidates.iter().map(|c| c.title.clone()).collect();

        let mut scores = self.scorer.score_many(&cleaned, &rendered);
        let by_title = self.scorer.score_many(&cleaned, &titles);
        keep_best(&mut scores, by_title);

        if let Some((_, title)) = parse(&cleaned).artist_title() {
            let by_parsed_title = self.scorer.score_many(title, &titles);
            keep_best(&mut scores, by_parsed_title);
        }
        scores
    }
}

fn keep_best(scores: &mut [Score], others: Vec<Score>) {
    for (score, other) in scores.iter_mut().zip(others) {
        if other.value > score.value {
            *score = other;
        }
    }
}

/// Match with lexical scoring and the default cleaner.
pub fn match_title(raw: &str, candidates: &[CatalogCandidate], threshold: f64) -> MatchResult {
    CandidateMatcher::new(SimilarityScorer::default(), threshold, TitleCleaner::default())
        .match_title(raw, candidates)
}

// ============================================================================
// TESTS
// ============================================================================
