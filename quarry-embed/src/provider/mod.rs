//! Embedding provider implementations
//!
//! A provider turns text into fixed-length `f32` vectors. Whatever the
//! underlying engine produces (half precision, nested JSON, tensors), the
//! provider converts it to `Vec<f32>` before returning, so the rest of the
//! system only ever sees one representation.

mod local;
mod remote;

pub use self::local::FastEmbedProvider;
pub use self::remote::{InputType, RemoteEmbedProvider};

use crate::config::{EmbedConfig, ProviderConfig};
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Result of embedding generation
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result.
    ///
    /// The dimension is inferred from the first embedding vector, or 0 when
    /// there are none.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input, in input order
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::provider(self.provider_name(), "no embedding generated"))
    }

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Identity used to namespace cached vectors.
    ///
    /// Two providers must only share an id if they produce identical vectors
    /// for identical text.
    fn provider_id(&self) -> String {
        format!("{}-{}", self.provider_name(), self.embedding_dimension())
    }
}

/// L2-normalise `vector` in place. Zero vectors are left untouched.
pub(crate) fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Construct the provider described by `config`.
///
/// The local provider downloads and loads its model here, so this can take a
/// while on first use.
pub async fn build_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.provider {
        ProviderConfig::Remote(remote) => {
            tracing::info!("Using remote embedding provider: {}", remote.model);
            let provider = RemoteEmbedProvider::new(remote.clone(), config.timeout)?;
            Ok(Arc::new(provider))
        }
        ProviderConfig::Local(local) => {
            tracing::info!("Using local embedding provider: {}", local.model_name);
            let provider = FastEmbedProvider::create(local.clone()).await?;
            Ok(Arc::new(provider))
        }
    }
}
