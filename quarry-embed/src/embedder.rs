//! Cached, deduplicating front end for an [`EmbeddingProvider`].
//!
//! [`Embedder::embed_batch`] resolves a batch of texts as follows:
//!
//! 1. Every text is looked up in the [`EmbeddingCache`] concurrently. Hits are
//!    placed at their original index.
//! 2. Misses are collected in order. Repeated texts within the batch collapse
//!    into a single pending entry that remembers every index it must fill.
//! 3. The provider is called once with the unique pending texts, under a
//!    timeout.
//! 4. The response must hold exactly one vector per pending text, each with
//!    the provider's dimension. Anything else fails the whole batch.
//! 5. Fresh vectors are written back to the cache (once per unique text) and
//!    fanned out to their indices.
//!
//! Cached vectors whose length no longer matches the provider's dimension are
//! ignored and recomputed.

use crate::cache::EmbeddingCache;
use crate::config::DEFAULT_TIMEOUT;
use crate::error::{EmbedError, Result};
use crate::provider::EmbeddingProvider;
use crate::store::CacheStore;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Embedding provider wrapped with the cache protocol.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    timeout: Duration,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.provider_id())
            .field("dimension", &self.provider.embedding_dimension())
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Misses awaiting the provider: unique texts and the output slots each fills.
#[derive(Default)]
struct Pending<'a> {
    texts: Vec<String>,
    targets: Vec<Vec<usize>>,
    slot_of: HashMap<&'a str, usize>,
}

impl<'a> Pending<'a> {
    fn add(&mut self, text: &'a str, index: usize) {
        match self.slot_of.get(text) {
            Some(&slot) => self.targets[slot].push(index),
            None => {
                self.slot_of.insert(text, self.texts.len());
                self.texts.push(text.to_string());
                self.targets.push(vec![index]);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

impl Embedder {
    /// Wrap `provider`, caching its vectors in `store` for `ttl`.
    ///
    /// Cache keys are namespaced by [`EmbeddingProvider::provider_id`].
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        let cache = EmbeddingCache::new(store, provider.provider_id(), ttl);
        Self {
            provider,
            cache,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the bound on a single provider call (builder style)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Fixed dimension of every vector this embedder returns.
    pub fn dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Embed a single text through the cached path.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    /// Embed `texts`, returning one vector per input in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dimension = self.dimension();
        let lookups = join_all(texts.iter().map(|text| self.cache.get(text))).await;

        let mut output: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut pending = Pending::default();

        for (index, (text, cached)) in texts.iter().zip(lookups).enumerate() {
            match cached {
                Some(vector) if vector.len() == dimension => output.push(Some(vector)),
                stale => {
                    if let Some(vector) = stale {
                        tracing::debug!(
                            "Ignoring cached embedding of dimension {} (expected {})",
                            vector.len(),
                            dimension
                        );
                    }
                    output.push(None);
                    pending.add(text, index);
                }
            }
        }

        tracing::debug!(
            "Embedding batch of {}: {} cache hits, {} unique texts for provider",
            texts.len(),
            output.iter().filter(|v| v.is_some()).count(),
            pending.texts.len()
        );

        if !pending.is_empty() {
            let fresh = self.call_provider(&pending.texts).await?;

            join_all(
                pending
                    .texts
                    .iter()
                    .zip(&fresh)
                    .map(|(text, vector)| self.cache.set(text, vector)),
            )
            .await;

            for (vector, targets) in fresh.into_iter().zip(pending.targets) {
                for index in targets {
                    output[index] = Some(vector.clone());
                }
            }
        }

        output
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EmbedError::provider(self.provider_name(), "batch left unresolved slots"))
    }

    async fn call_provider(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let result = tokio::time::timeout(self.timeout, self.provider.embed_texts(texts))
            .await
            .map_err(|_| EmbedError::Timeout {
                provider: self.provider_name().to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        if result.embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: result.embeddings.len(),
            });
        }

        let dimension = self.dimension();
        if let Some(bad) = result.embeddings.iter().find(|v| v.len() != dimension) {
            return Err(EmbedError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(result.embeddings)
    }
}
