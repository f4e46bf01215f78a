//! Pretrained sentence-transformer embeddings through fastembed (ONNX runtime).
//!
//! Weights are downloaded to the fastembed cache on first load. Loading is
//! slow, so callers wrap this in [`crate::embedding::LazyEmbedder`].

use fastembed::{EmbeddingModel as FastModel, InitOptions, TextEmbedding};
use log::info;
use std::sync::Mutex;

use crate::embedding::{Embedder, EmbeddingError, EmbeddingModel};

/// fastembed model backing a pretrained id. `None` for the built-in tiers.
///
/// fastembed ships no L3 paraphrase model, so `paraphrase-MiniLM-L3-v2` maps
/// to the smallest paraphrase MiniLM it has (L12). `all-mpnet-base-v2` maps
/// to the paraphrase-tuned MPNet base.
pub fn fastembed_model(model: EmbeddingModel) -> Option<FastModel> {
    match model {
        EmbeddingModel::StringOnly | EmbeddingModel::HashedTrigram => None,
        EmbeddingModel::MiniLmL3 => Some(FastModel::ParaphraseMLMiniLML12V2),
        EmbeddingModel::MiniLmL6 => Some(FastModel::AllMiniLML6V2),
        EmbeddingModel::MiniLmL12 => Some(FastModel::AllMiniLML12V2),
        EmbeddingModel::MpnetBase => Some(FastModel::ParaphraseMLMpnetBaseV2),
    }
}

pub struct FastEmbedEmbedder {
    model: EmbeddingModel,
    inner: Mutex<TextEmbedding>,
}

impl FastEmbedEmbedder {
    /// Load (downloading if needed) the weights for `model`
    pub fn load(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
        let load_error = |reason: String| EmbeddingError::Load {
            model: model.id().to_string(),
            reason,
        };
        let fast = fastembed_model(model)
            .ok_or_else(|| load_error("not a pretrained model".to_string()))?;

        info!("Loading {} ({})", model.display_name(), model.approx_size());
        let options = InitOptions::new(fast).with_show_download_progress(false);
        let inner = TextEmbedding::try_new(options).map_err(|e| load_error(e.to_string()))?;

        Ok(Self {
            model,
            inner: Mutex::new(inner),
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| EmbeddingError::Unavailable("embedding session poisoned".to_string()))?;
        let mut vectors = inner
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
        vectors.pop().ok_or(EmbeddingError::Degenerate)
    }

    fn model_name(&self) -> &str {
        self.model.id()
    }
}
