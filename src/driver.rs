//! Batch driver: runs the query plan against a catalog, pools candidates and
//! matches titles in parallel.

use log::{debug, warn};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::MatchConfig;
use crate::embedding::{embedder_for, Embedder};
use crate::matcher::CandidateMatcher;
use crate::models::{CatalogCandidate, MatchReport, MatchResult};
use crate::progress::{create_progress_bar, log_progress};
use crate::queries::QueryBuilder;
use crate::scoring::SimilarityScorer;

const LOG_INTERVAL: u64 = 1_000;

/// Catalog search collaborator.
pub trait CatalogSearch: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CatalogCandidate>>;
}

/// One title with candidates fetched ahead of time.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchedTitle {
    pub title: String,
    #[serde(default)]
    pub candidates: Vec<CatalogCandidate>,
}

// ============================================================================
// Candidate pooling
// ============================================================================

/// Drop candidates whose id was already seen, keeping first occurrences.
pub fn dedup_candidates(candidates: Vec<CatalogCandidate>) -> Vec<CatalogCandidate> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

/// Run queries in order until `min_pool` distinct candidates are gathered.
/// A failing query is logged and skipped.
pub fn gather_candidates<S: CatalogSearch + ?Sized>(
    search: &S,
    queries: &[String],
    limit: usize,
    min_pool: usize,
) -> Vec<CatalogCandidate> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut pool = Vec::new();

    for query in queries {
        if pool.len() >= min_pool {
            break;
        }
        let found = match search.search(query, limit) {
            Ok(found) => found,
            Err(e) => {
                warn!("catalog search failed for {query:?}: {e:#}");
                continue;
            }
        };
        debug!("query {query:?} returned {} candidates", found.len());
        for candidate in found {
            if seen.insert(candidate.id.clone()) {
                pool.push(candidate);
            }
        }
    }
    pool
}

// ============================================================================
// Pipeline
// ============================================================================

/// Query builder plus matcher, configured together.
#[derive(Clone)]
pub struct Pipeline {
    queries: QueryBuilder,
    matcher: CandidateMatcher,
    search_limit: usize,
    min_pool: usize,
}

impl Pipeline {
    /// Build from settings, using the built-in embedder for the configured model
    pub fn from_config(config: &MatchConfig) -> Self {
        Self::with_embedder(config, embedder_for(config.embedding_model))
    }

    /// Build from settings with an explicitly supplied embedder
    pub fn with_embedder(config: &MatchConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        let scorer = SimilarityScorer::from_embedder(embedder, config.lexical_metric);
        Self {
            queries: config.query_builder(),
            matcher: CandidateMatcher::new(scorer, config.threshold, config.cleaner()),
            search_limit: config.search_limit,
            min_pool: config.min_pool,
        }
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        self.matcher.scorer()
    }

    pub fn queries(&self, raw: &str) -> Vec<String> {
        self.queries.build(raw)
    }

    /// Search, pool and match one title
    pub fn resolve<S: CatalogSearch + ?Sized>(&self, raw: &str, search: &S) -> MatchResult {
        let queries = self.queries(raw);
        let pool = gather_candidates(search, &queries, self.search_limit, self.min_pool);
        self.matcher.match_title(raw, &pool)
    }

    /// Match one title against an already fetched pool
    pub fn match_pool(&self, raw: &str, candidates: Vec<CatalogCandidate>) -> MatchResult {
        self.matcher.match_title(raw, &dedup_candidates(candidates))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_embedder(&MatchConfig::default(), None)
    }
}

// ============================================================================
// Batch matching
// ============================================================================

/// Resolve every title through the catalog in parallel.
pub fn match_batch<S: CatalogSearch + ?Sized>(
    pipeline: &Pipeline,
    titles: &[String],
    search: &S,
) -> MatchReport {
    let titles: Vec<&String> = titles.iter().collect();
    run_batch(titles, "Matching titles", |raw| {
        (raw.clone(), pipeline.resolve(raw, search))
    })
}

/// Match titles whose candidates were fetched ahead of time.
pub fn match_prefetched(pipeline: &Pipeline, items: Vec<PrefetchedTitle>) -> MatchReport {
    run_batch(items, "Matching titles", |item| {
        let result = pipeline.match_pool(&item.title, item.candidates);
        (item.title, result)
    })
}

fn run_batch<T, F>(items: Vec<T>, msg: &str, match_one: F) -> MatchReport
where
    T: Send,
    F: Fn(T) -> (String, MatchResult) + Sync + Send,
{
    let start = Instant::now();
    let total = items.len() as u64;
    let pb = create_progress_bar(total, msg);
    let done = AtomicU64::new(0);

    // Indexed parallel iteration keeps input order in the report
    let results: Vec<(String, MatchResult)> = items
        .into_par_iter()
        .map(|item| {
            let out = match_one(item);
            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("match", current, total, LOG_INTERVAL);
            out
        })
        .collect();
    pb.finish_with_message(format!("Matched {} titles", results.len()));

    let mut report = MatchReport::default();
    for (raw, result) in &results {
        report.record(raw, result);
    }
    report.elapsed_seconds = start.elapsed().as_secs_f64();
    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, Strategy};
    use anyhow::bail;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory catalog keyed by exact query, recording every call
    #[derive(Default)]
    struct FakeCatalog {
        results: HashMap<String, Vec<CatalogCandidate>>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with(mut self, query: &str, candidates: Vec<CatalogCandidate>) -> Self {
            self.results.insert(query.to_string(), candidates);
            self
        }

        fn failing_on(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CatalogSearch for FakeCatalog {
        fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CatalogCandidate>> {
            self.calls.lock().unwrap().push(query.to_string());
            if self.failing.iter().any(|q| q == query) {
                bail!("catalog unavailable");
            }
            let mut found = self.results.get(query).cloned().unwrap_or_default();
            found.truncate(limit);
            Ok(found)
        }
    }

    fn candidate(id: &str, artist: &str, title: &str) -> CatalogCandidate {
        CatalogCandidate::new(id, artist, title)
    }

    #[test]
    fn test_dedup_candidates_keeps_first() {
        let deduped = dedup_candidates(vec![
            candidate("1", "A", "first"),
            candidate("2", "B", "x"),
            candidate("1", "A", "second"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "first");
    }

    #[test]
    fn test_gather_stops_at_min_pool() {
        let catalog = FakeCatalog::default()
            .with("q1", vec![candidate("1", "A", "a"), candidate("2", "B", "b")])
            .with("q2", vec![candidate("3", "C", "c")]);
        let queries = vec!["q1".to_string(), "q2".to_string()];

        let pool = gather_candidates(&catalog, &queries, 10, 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(catalog.calls(), vec!["q1".to_string()]);
    }

    #[test]
    fn test_gather_dedups_across_queries() {
        let catalog = FakeCatalog::default()
            .with("q1", vec![candidate("1", "A", "a")])
            .with("q2", vec![candidate("1", "A", "a"), candidate("2", "B", "b")]);
        let queries = vec!["q1".to_string(), "q2".to_string()];

        let pool = gather_candidates(&catalog, &queries, 10, 10);
        let ids: Vec<&str> = pool.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_gather_skips_failing_query() {
        let catalog = FakeCatalog::default()
            .failing_on("q1")
            .with("q2", vec![candidate("2", "B", "b")]);
        let queries = vec!["q1".to_string(), "q2".to_string()];

        let pool = gather_candidates(&catalog, &queries, 10, 10);
        assert_eq!(pool.len(), 1);
        assert_eq!(catalog.calls().len(), 2);
    }

    #[test]
    fn test_gather_respects_limit() {
        let catalog = FakeCatalog::default().with(
            "q",
            vec![candidate("1", "A", "a"), candidate("2", "B", "b"), candidate("3", "C", "c")],
        );
        let pool = gather_candidates(&catalog, &["q".to_string()], 2, 10);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_resolve_uses_query_plan() {
        let catalog = FakeCatalog::default().with(
            "The Beatles Hey Jude",
            vec![candidate("hj", "The Beatles", "Hey Jude"), candidate("lb", "The Beatles", "Let It Be")],
        );
        let pipeline = Pipeline::default();

        let result = pipeline.resolve("The Beatles - Hey Jude (Official Video)", &catalog);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.candidate.map(|c| c.id), Some("hj".to_string()));
        assert_eq!(catalog.calls()[0], "The Beatles Hey Jude");
    }

    #[test]
    fn test_resolve_nothing_found() {
        let catalog = FakeCatalog::default();
        let result = Pipeline::default().resolve("Unknown - Nothing", &catalog);
        assert_eq!(result.confidence, Confidence::NotFound);
        // Every query tried when the pool never fills
        assert_eq!(catalog.calls().len(), Pipeline::default().queries("Unknown - Nothing").len());
    }

    #[test]
    fn test_match_batch_report() {
        let catalog = FakeCatalog::default()
            .with("Queen Bohemian Rhapsody", vec![candidate("br", "Queen", "Bohemian Rhapsody")])
            .with("Adele Hello", vec![candidate("es", "Metallica", "Enter Sandman")]);
        let titles = vec![
            "Queen - Bohemian Rhapsody [HD]".to_string(),
            "Adele - Hello".to_string(),
            "Nobody - Nothing".to_string(),
        ];

        let report = match_batch(&Pipeline::default(), &titles, &catalog);
        assert_eq!((report.high, report.low, report.not_found), (1, 1, 1));
        assert_eq!(report.entries.len(), 3);
        // Input order preserved
        assert_eq!(report.entries[0].raw, titles[0]);
        assert_eq!(report.entries[2].confidence, Confidence::NotFound);
        assert!(report.elapsed_seconds >= 0.0);
    }

    #[test]
    fn test_match_prefetched() {
        let items: Vec<PrefetchedTitle> = serde_json::from_str(
            r#"[
                {"title": "Metallica - Enter Sandman (Official Music Video)",
                 "candidates": [{"id": "1", "artist": "Metallica", "title": "Enter Sandman"},
                                {"id": "1", "artist": "Metallica", "title": "Enter Sandman"}]},
                {"title": "No candidates here"}
            ]"#,
        )
        .unwrap();

        let report = match_prefetched(&Pipeline::default(), items);
        assert_eq!(report.high, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.entries[0].candidate_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_pipeline_with_trigram_embedder_scores_semantically() {
        let config = MatchConfig {
            embedding_model: crate::embedding::EmbeddingModel::HashedTrigram,
            ..MatchConfig::default()
        };
        let pipeline = Pipeline::from_config(&config);
        assert!(pipeline.scorer().describe().contains("hashed-trigram"));
        let result = pipeline.match_pool("Queen - Innuendo", vec![candidate("1", "Queen", "Innuendo")]);
        assert_eq!(result.strategy, Strategy::Semantic);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[cfg(not(feature = "semantic"))]
    #[test]
    fn test_pipeline_with_unavailable_model_scores_lexically() {
        let config = MatchConfig {
            embedding_model: crate::embedding::EmbeddingModel::MpnetBase,
            ..MatchConfig::default()
        };
        let pipeline = Pipeline::from_config(&config);
        let result = pipeline.match_pool("Queen - Innuendo", vec![candidate("1", "Queen", "Innuendo")]);
        assert_eq!(result.strategy, Strategy::Lexical);
        assert_eq!(result.confidence, Confidence::High);
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::embedding::EmbeddingError> {
            Err(crate::embedding::EmbeddingError::Unavailable("offline".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_semantic_count_ignores_unscored_results() {
        let pipeline = Pipeline::with_embedder(&MatchConfig::default(), Some(Arc::new(FailingEmbedder)));
        let items = vec![
            PrefetchedTitle {
                title: "Nobody - Nothing".to_string(),
                candidates: vec![],
            },
            PrefetchedTitle {
                title: "Queen - Innuendo".to_string(),
                candidates: vec![candidate("1", "Queen", "Innuendo")],
            },
        ];

        let report = match_prefetched(&pipeline, items);
        assert_eq!(report.entries[0].confidence, Confidence::NotFound);
        assert_eq!(report.entries[0].strategy, Strategy::Lexical);
        assert_eq!(report.entries[1].strategy, Strategy::Lexical);
        assert_eq!(report.semantic_scored, 0);
    }

    #[test]
    fn test_semantic_count_with_working_embedder() {
        let embedder: Arc<dyn Embedder> = Arc::new(crate::embedding::HashedTrigramEmbedder::default());
        let pipeline = Pipeline::with_embedder(&MatchConfig::default(), Some(embedder));
        let items = vec![
            PrefetchedTitle {
                title: "Nobody - Nothing".to_string(),
                candidates: vec![],
            },
            PrefetchedTitle {
                title: "Queen - Innuendo".to_string(),
                candidates: vec![candidate("1", "Queen", "Innuendo")],
            },
        ];

        let report = match_prefetched(&pipeline, items);
        assert_eq!(report.semantic_scored, 1);
    }
}
