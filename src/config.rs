//! Matching settings read from a JSON file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cleaner::{TitleCleaner, DEFAULT_DECORATIVE_TOKENS};
use crate::embedding::EmbeddingModel;
use crate::matcher::DEFAULT_THRESHOLD;
use crate::queries::QueryBuilder;
use crate::scoring::LexicalMetric;

/// Catalog results requested per query.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Stop running queries once this many distinct candidates are pooled.
pub const DEFAULT_MIN_POOL: usize = 10;

/// Settings for a matching run. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub threshold: f64,
    pub decorative_tokens: Vec<String>,
    pub embedding_model: EmbeddingModel,
    pub lexical_metric: LexicalMetric,
    pub min_pool: usize,
    pub search_limit: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            decorative_tokens: DEFAULT_DECORATIVE_TOKENS.iter().map(|t| t.to_string()).collect(),
            embedding_model: EmbeddingModel::default(),
            lexical_metric: LexicalMetric::default(),
            min_pool: DEFAULT_MIN_POOL,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl MatchConfig {
    /// Read and validate a JSON settings file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: MatchConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            bail!("threshold must be within [0, 1], got {}", self.threshold);
        }
        if self.search_limit == 0 {
            bail!("search_limit must be at least 1");
        }
        if self.min_pool == 0 {
            bail!("min_pool must be at least 1");
        }
        Ok(())
    }

    pub fn cleaner(&self) -> TitleCleaner {
        TitleCleaner::new(&self.decorative_tokens)
    }

    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.cleaner())
    }
}
