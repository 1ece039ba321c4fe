use super::{EmbeddingProvider, EmbeddingResult, normalize};
use crate::config::LocalConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Local embedding provider running an ONNX model through fastembed.
///
/// Inference runs on tokio's blocking pool. Output vectors are L2-normalised
/// so cosine similarity reduces to a dot product downstream.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: LocalConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

/// Map a model identifier onto a built-in fastembed model.
///
/// Organisation prefixes are ignored, so `Xenova/all-MiniLM-L6-v2` and
/// `sentence-transformers/all-MiniLM-L6-v2` resolve to the same model.
pub(crate) fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        _ => Err(EmbedError::invalid_config(format!(
            "Unsupported local embedding model: {name}"
        ))),
    }
}

impl FastEmbedProvider {
    /// Download (if needed) and load the configured model.
    pub async fn create(config: LocalConfig) -> Result<Self> {
        let model_kind = resolve_model(&config.model_name)?;
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            config.model_name
        );

        let load_config = config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let mut init_options =
                    InitOptions::new(model_kind).with_show_download_progress(true);
                if let Some(cache_dir) = &load_config.cache_dir {
                    init_options = init_options.with_cache_dir(cache_dir.clone());
                }

                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                // Get dimension by generating a test embedding
                let sample = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = sample.first().map(|emb| emb.len()).ok_or_else(|| {
                    EmbedError::provider("fastembed", "model produced no sample embedding")
                })?;

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let chunk = chunk.to_vec();
            let model = Arc::clone(&self.model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut model_guard = model
                    .lock()
                    .map_err(|_| EmbedError::provider("fastembed", "model lock poisoned"))?;
                model_guard
                    .embed(chunk, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(batch_embeddings.into_iter().map(|mut embedding| {
                normalize(&mut embedding);
                embedding
            }));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn provider_id(&self) -> String {
        let short = self
            .config
            .model_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.config.model_name)
            .to_ascii_lowercase();
        format!("fastembed-{short}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_names() {
        assert!(matches!(
            resolve_model("Xenova/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("BAAI/bge-small-en-v1.5"),
            Ok(EmbeddingModel::BGESmallENV15)
        ));
        assert!(matches!(
            resolve_model("no-such-model"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    #[ignore] // Downloads the model - run with: cargo test test_fastembed_local_model -- --ignored
    async fn test_fastembed_local_model() -> Result<()> {
        let provider = FastEmbedProvider::create(LocalConfig::default()).await?;
        assert_eq!(provider.embedding_dimension(), 384);
        assert_eq!(provider.provider_id(), "fastembed-all-minilm-l6-v2");

        let texts = vec![
            "The sky is blue.".to_string(),
            "Cats are mammals.".to_string(),
        ];
        let result = provider.embed_texts(&texts).await?;
        assert_eq!(result.len(), 2);
        for embedding in &result.embeddings {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3);
        }
        Ok(())
    }
}
