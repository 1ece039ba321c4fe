use super::{EmbeddingProvider, EmbeddingResult};
use crate::config::RemoteConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the remote model should treat the submitted texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    SearchQuery,
    SearchDocument,
}

impl InputType {
    /// A call carrying a single text is a query; anything larger is corpus material.
    pub fn for_batch(len: usize) -> Self {
        if len == 1 {
            Self::SearchQuery
        } else {
            Self::SearchDocument
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: InputType,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for a Cohere-compatible batch embedding endpoint.
///
/// Inputs larger than the configured batch limit are sent as consecutive
/// sub-batches and the results concatenated in order.
#[derive(Debug, Clone)]
pub struct RemoteEmbedProvider {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl RemoteEmbedProvider {
    pub fn new(config: RemoteConfig, timeout: Duration) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EmbedError::invalid_config("remote embedding API key is empty"));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embed", self.config.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        tracing::debug!(
            "Requesting {} embeddings from {} ({:?})",
            texts.len(),
            self.config.model,
            input_type
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&EmbedRequest {
                texts,
                model: &self.config.model,
                input_type,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(EmbedError::provider(
                self.provider_name(),
                format!("HTTP {status}: {snippet}"),
            ));
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: parsed.embeddings.len(),
            });
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        // Decided on the whole call so a short trailing sub-batch is not mistaken for a query.
        let input_type = InputType::for_batch(texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.max_batch_size.max(1)) {
            embeddings.extend(self.embed_batch(batch, input_type).await?);
        }
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "cohere"
    }

    fn provider_id(&self) -> String {
        format!("cohere-{}", self.config.model)
    }
}
