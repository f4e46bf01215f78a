//! Embedding model collaborator.
//!
//! The semantic scorer only needs `embed(text) -> vector`. This module holds
//! that contract, the selectable model ids, a load-once wrapper for models
//! that are expensive to initialise, and a small in-process embedder that
//! needs no download.

use log::warn;
use once_cell::sync::OnceCell;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::normalize::normalize_for_comparison;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load embedding model {model}: {reason}")]
    Load { model: String, reason: String },
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding dimensions differ: {left} vs {right}")]
    Dimension { left: usize, right: usize },
    #[error("embedding vector has no direction (zero or non-finite)")]
    Degenerate,
}

// ============================================================================
// Embedder contract
// ============================================================================

/// Text → fixed-length vector. Implementations must be safe for concurrent
/// reads once constructed.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    fn model_name(&self) -> &str;
}

/// Cosine similarity of two embeddings.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::Dimension {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() || !dot.is_finite() {
        return Err(EmbeddingError::Degenerate);
    }
    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

// ============================================================================
// Model selection
// ============================================================================

/// Selectable embedding models. `StringOnly` disables semantic scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingModel {
    #[serde(rename = "string_only")]
    StringOnly,
    #[serde(rename = "hashed-trigram")]
    HashedTrigram,
    #[serde(rename = "paraphrase-MiniLM-L3-v2")]
    MiniLmL3,
    #[serde(rename = "all-MiniLM-L6-v2")]
    MiniLmL6,
    #[serde(rename = "all-MiniLM-L12-v2")]
    MiniLmL12,
    #[serde(rename = "all-mpnet-base-v2")]
    MpnetBase,
}

impl EmbeddingModel {
    pub const ALL: [EmbeddingModel; 6] = [
        EmbeddingModel::StringOnly,
        EmbeddingModel::HashedTrigram,
        EmbeddingModel::MiniLmL3,
        EmbeddingModel::MiniLmL6,
        EmbeddingModel::MiniLmL12,
        EmbeddingModel::MpnetBase,
    ];

    /// Identifier used in settings files and on the command line
    pub fn id(self) -> &'static str {
        match self {
            EmbeddingModel::StringOnly => "string_only",
            EmbeddingModel::HashedTrigram => "hashed-trigram",
            EmbeddingModel::MiniLmL3 => "paraphrase-MiniLM-L3-v2",
            EmbeddingModel::MiniLmL6 => "all-MiniLM-L6-v2",
            EmbeddingModel::MiniLmL12 => "all-MiniLM-L12-v2",
            EmbeddingModel::MpnetBase => "all-mpnet-base-v2",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EmbeddingModel::StringOnly => "String Matching Only",
            EmbeddingModel::HashedTrigram => "Hashed Trigrams",
            EmbeddingModel::MiniLmL3 => "MiniLM-L3",
            EmbeddingModel::MiniLmL6 => "MiniLM-L6",
            EmbeddingModel::MiniLmL12 => "MiniLM-L12",
            EmbeddingModel::MpnetBase => "MPNet Base",
        }
    }

    /// Approximate download size
    pub fn approx_size(self) -> &'static str {
        match self {
            EmbeddingModel::StringOnly | EmbeddingModel::HashedTrigram => "0MB",
            EmbeddingModel::MiniLmL3 => "~60MB",
            EmbeddingModel::MiniLmL6 => "~80MB",
            EmbeddingModel::MiniLmL12 => "~120MB",
            EmbeddingModel::MpnetBase => "~420MB",
        }
    }

    pub fn is_string_only(self) -> bool {
        self == EmbeddingModel::StringOnly
    }

    /// Sentence-transformer models backed by fastembed
    pub fn is_pretrained(self) -> bool {
        !matches!(self, EmbeddingModel::StringOnly | EmbeddingModel::HashedTrigram)
    }

    /// Whether this build can actually load the model
    pub fn is_available(self) -> bool {
        !self.is_pretrained() || cfg!(feature = "semantic")
    }
}

/// MPNet when pretrained models can be loaded, plain string matching otherwise.
impl Default for EmbeddingModel {
    fn default() -> Self {
        if cfg!(feature = "semantic") {
            EmbeddingModel::MpnetBase
        } else {
            EmbeddingModel::StringOnly
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        EmbeddingModel::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<&str> = EmbeddingModel::ALL.iter().map(|m| m.id()).collect();
                format!("unknown embedding model '{}' (valid: {})", wanted, valid.join(", "))
            })
    }
}

// ============================================================================
// Load-once wrapper
// ============================================================================

type Loader = Box<dyn Fn() -> Result<Box<dyn Embedder>, EmbeddingError> + Send + Sync>;

/// Defers model loading to the first `embed` call. Concurrent first calls
/// wait on a single initialisation; a failed load is remembered and every
/// later call reports the model as unavailable.
pub struct LazyEmbedder {
    name: String,
    loader: Loader,
    model: OnceCell<Result<Box<dyn Embedder>, String>>,
}

impl LazyEmbedder {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Embedder>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// True once a load has succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    fn get(&self) -> Result<&dyn Embedder, EmbeddingError> {
        let loaded = self.model.get_or_init(|| {
            (self.loader)().map_err(|e| {
                warn!("embedding model {} failed to load: {e}", self.name);
                e.to_string()
            })
        });
        match loaded {
            Ok(model) => Ok(model.as_ref()),
            Err(reason) => Err(EmbeddingError::Unavailable(reason.clone())),
        }
    }
}

impl Embedder for LazyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.get()?.embed(text)
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Hashed trigram embedder
// ============================================================================

pub const DEFAULT_TRIGRAM_DIMENSIONS: usize = 256;

/// Character-trigram counts of the comparison form, feature-hashed into a
/// fixed number of buckets and L2-normalised. Deterministic; no model files.
#[derive(Debug, Clone)]
pub struct HashedTrigramEmbedder {
    dimensions: usize,
}

impl HashedTrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl Default for HashedTrigramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGRAM_DIMENSIONS)
    }
}

impl Embedder for HashedTrigramEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = normalize_for_comparison(text);
        if normalized.is_empty() {
            return Ok(vector);
        }

        // Pad so word starts and ends form their own trigrams
        let chars: Vec<char> = format!(" {normalized} ").chars().collect();
        for window in chars.windows(3) {
            let mut hasher = FxHasher::default();
            window.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        EmbeddingModel::HashedTrigram.id()
    }
}

// ============================================================================
// Built-in embedders
// ============================================================================

/// Embedder for a configured model.
///
/// `string_only` means no embedder. Pretrained models load lazily on first
/// use; without the `semantic` feature their load fails once and scoring
/// stays lexical.
pub fn embedder_for(model: EmbeddingModel) -> Option<Arc<dyn Embedder>> {
    match model {
        EmbeddingModel::StringOnly => None,
        EmbeddingModel::HashedTrigram => Some(Arc::new(HashedTrigramEmbedder::default())),
        pretrained => Some(Arc::new(LazyEmbedder::new(pretrained.id(), move || {
            load_pretrained(pretrained)
        }))),
    }
}

#[cfg(feature = "semantic")]
fn load_pretrained(model: EmbeddingModel) -> Result<Box<dyn Embedder>, EmbeddingError> {
    let embedder = crate::fastembed_embedder::FastEmbedEmbedder::load(model)?;
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "semantic"))]
fn load_pretrained(model: EmbeddingModel) -> Result<Box<dyn Embedder>, EmbeddingError> {
    Err(EmbeddingError::Load {
        model: model.id().to_string(),
        reason: "built without the `semantic` feature".to_string(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
