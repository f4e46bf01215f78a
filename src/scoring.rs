//! Similarity scoring between a title and a candidate rendering.
//!
//! This module contains:
//! - The lexical gestalt (Ratcliff/Obershelp) ratio and strsim alternatives
//! - Semantic scoring over an injected embedder
//! - Per-call fallback from semantic to lexical scoring

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::embedding::{cosine_similarity, Embedder, EmbeddingError};
use crate::models::Strategy;
use crate::normalize::normalize_for_comparison;

// ============================================================================
// Score
// ============================================================================

/// Similarity in `[0, 1]` and the strategy that actually produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub strategy: Strategy,
}

impl Score {
    fn lexical(value: f64) -> Self {
        Self {
            value,
            strategy: Strategy::Lexical,
        }
    }
}

/// Scoring contract the matcher is written against.
pub trait Scorer: Send + Sync {
    /// Strategy this scorer attempts first
    fn strategy(&self) -> Strategy;

    fn score(&self, a: &str, b: &str) -> Score;

    /// Score one query against many renderings
    fn score_many(&self, query: &str, others: &[String]) -> Vec<Score> {
        others.iter().map(|other| self.score(query, other)).collect()
    }
}

// ============================================================================
// Lexical
// ============================================================================

/// String metric used on the normalized forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalMetric {
    /// 2*M/T over recursively matched longest common blocks
    #[default]
    Gestalt,
    JaroWinkler,
    NormalizedLevenshtein,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer {
    metric: LexicalMetric,
}

impl LexicalScorer {
    pub fn new(metric: LexicalMetric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> LexicalMetric {
        self.metric
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = normalize_for_comparison(a);
        let b = normalize_for_comparison(b);
        // Nothing to compare: no evidence either way
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }
        let value = match self.metric {
            LexicalMetric::Gestalt => gestalt_ratio(&a, &b),
            LexicalMetric::JaroWinkler => strsim::jaro_winkler(&a, &b),
            LexicalMetric::NormalizedLevenshtein => strsim::normalized_levenshtein(&a, &b),
        };
        value.clamp(0.0, 1.0)
    }
}

impl Scorer for LexicalScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Lexical
    }

    fn score(&self, a: &str, b: &str) -> Score {
        Score::lexical(self.similarity(a, b))
    }
}

/// Gestalt pattern-matching ratio: `2 * matched / (len(a) + len(b))`,
/// counted in chars. Both empty → 0.0.
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total size of the longest common block plus, recursively, the blocks
/// to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, len) = longest_common_block(a, b, a_lo, a_hi, b_lo, b_hi);
        if len == 0 {
            continue;
        }
        matched += len;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + len < a_hi && j + len < b_hi {
            pending.push((i + len, a_hi, j + len, b_hi));
        }
    }
    matched
}

/// Longest common substring of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_common_block(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    let (mut best_i, mut best_j, mut best_len) = (a_lo, b_lo, 0);

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let col = j - b_lo + 1;
            if a[i] == b[j] {
                let len = prev[col - 1] + 1;
                cur[col] = len;
                if len > best_len {
                    best_len = len;
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_len)
}

/// Lexical similarity with the default metric.
pub fn similarity(a: &str, b: &str) -> f64 {
    LexicalScorer::default().similarity(a, b)
}

// ============================================================================
// Semantic
// ============================================================================

/// Cosine similarity over an injected embedder, clipped to `[0, 1]`.
/// Any embedding failure is scored lexically instead.
#[derive(Clone)]
pub struct SemanticScorer {
    embedder: Arc<dyn Embedder>,
    fallback: LexicalScorer,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn Embedder>, fallback: LexicalScorer) -> Self {
        Self { embedder, fallback }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn semantic(&self, query: &[f32], other: &str) -> Result<f64, EmbeddingError> {
        let other = self.embedder.embed(other)?;
        let cosine = cosine_similarity(query, &other)?;
        // Titles are not expected to be semantically opposite
        Ok((cosine as f64).clamp(0.0, 1.0))
    }

    fn fall_back(&self, a: &str, b: &str, err: &EmbeddingError) -> Score {
        debug!(
            "semantic scoring via {} unavailable ({err}); scoring lexically",
            self.embedder.model_name()
        );
        self.fallback.score(a, b)
    }
}

impl Scorer for SemanticScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }

    fn score(&self, a: &str, b: &str) -> Score {
        let result = self
            .embedder
            .embed(a)
            .and_then(|query| self.semantic(&query, b));
        match result {
            Ok(value) => Score {
                value,
                strategy: Strategy::Semantic,
            },
            Err(e) => self.fall_back(a, b, &e),
        }
    }

    fn score_many(&self, query: &str, others: &[String]) -> Vec<Score> {
        // Embed the query once for the whole pool
        let query_vec = match self.embedder.embed(query) {
            Ok(v) => v,
            Err(e) => return others.iter().map(|o| self.fall_back(query, o, &e)).collect(),
        };
        others
            .iter()
            .map(|other| match self.semantic(&query_vec, other) {
                Ok(value) => Score {
                    value,
                    strategy: Strategy::Semantic,
                },
                Err(e) => self.fall_back(query, other, &e),
            })
            .collect()
    }
}

// ============================================================================
// Strategy selection
// ============================================================================

/// Concrete scorer chosen from configuration.
#[derive(Clone)]
pub enum SimilarityScorer {
    Lexical(LexicalScorer),
    Semantic(SemanticScorer),
}

impl SimilarityScorer {
    pub fn lexical(metric: LexicalMetric) -> Self {
        SimilarityScorer::Lexical(LexicalScorer::new(metric))
    }

    pub fn semantic(embedder: Arc<dyn Embedder>, metric: LexicalMetric) -> Self {
        SimilarityScorer::Semantic(SemanticScorer::new(embedder, LexicalScorer::new(metric)))
    }

    /// Semantic when an embedder exists, lexical otherwise
    pub fn from_embedder(embedder: Option<Arc<dyn Embedder>>, metric: LexicalMetric) -> Self {
        match embedder {
            Some(embedder) => Self::semantic(embedder, metric),
            None => Self::lexical(metric),
        }
    }
}

impl SimilarityScorer {
    /// One-line description for logs
    pub fn describe(&self) -> String {
        match self {
            SimilarityScorer::Lexical(s) => format!("lexical ({:?})", s.metric()),
            SimilarityScorer::Semantic(s) => format!(
                "semantic via {} (lexical fallback {:?})",
                s.model_name(),
                s.fallback.metric()
            ),
        }
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::lexical(LexicalMetric::default())
    }
}

impl Scorer for SimilarityScorer {
    fn strategy(&self) -> Strategy {
        match self {
            SimilarityScorer::Lexical(s) => s.strategy(),
            SimilarityScorer::Semantic(s) => s.strategy(),
        }
    }

    fn score(&self, a: &str, b: &str) -> Score {
        match self {
            SimilarityScorer::Lexical(s) => s.score(a, b),
            SimilarityScorer::Semantic(s) => s.score(a, b),
        }
    }

    fn score_many(&self, query: &str, others: &[String]) -> Vec<Score> {
        match self {
            SimilarityScorer::Lexical(s) => s.score_many(query, others),
            SimilarityScorer::Semantic(s) => s.score_many(query, others),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
