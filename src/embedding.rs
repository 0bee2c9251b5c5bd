//! Embedding provider wrapper around fastembed.
//!
//! The rest of the crate treats embeddings as opaque fixed-length vectors;
//! this module is the only place that knows how they are produced. The
//! model is identified by a SHA256 of its name so an index artifact can be
//! checked against the model that will embed queries.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingProvider {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dims: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("unknown model: {0}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5")]
    InvalidModel(String),
}

impl EmbeddingProvider {
    /// Load (downloading on first use) the named model, caching files under
    /// `cache_dir/models`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir)
            .map_err(|e| EmbeddingError::InitFailed(format!("creating models dir: {e}")))?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dims = probe_dims(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dims,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Embedding dimension D, fixed for the lifetime of one index.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {e}")))?;

        let mut embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        if embeddings.is_empty() {
            return Err(EmbeddingError::EmbeddingFailed("no embedding returned".to_string()));
        }
        Ok(embeddings.remove(0))
    }

    /// Embed a batch of texts, one vector per input, order preserved.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {e}")))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    /// SHA256 of the model name, stored in the index artifact header.
    pub fn model_id_hash(&self) -> [u8; 32] {
        model_id_for(&self.model_name)
    }
}

/// SHA256 identity for a model name.
pub fn model_id_for(model_name: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.finalize().into()
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        _ => Err(EmbeddingError::InvalidModel(name.to_string())),
    }
}

fn probe_dims(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
    let probe = model
        .embed(vec!["probe"], None)
        .map_err(|e| EmbeddingError::InitFailed(format!("probing dimensions: {e}")))?;

    probe
        .first()
        .map(|v| v.len())
        .ok_or_else(|| EmbeddingError::InitFailed("model returned no embedding".to_string()))
}
