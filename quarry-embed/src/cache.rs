//! Content-addressed embedding cache.
//!
//! Vectors are stored under `embed:{provider_id}:{sha256(text)}` as JSON
//! numeric arrays. Including the provider id keeps vectors from different
//! models (and different dimensions) apart when they share one store.
//!
//! The cache is advisory. Storage faults are logged and reported as a miss
//! (reads) or silently dropped (writes), so an unavailable store only costs
//! extra provider calls.

use crate::store::CacheStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Hex-encoded SHA-256 of the exact UTF-8 bytes of `text`.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Embedding cache keyed by text content.
#[derive(Clone)]
pub struct EmbeddingCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("backend", &self.store.backend_name())
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl EmbeddingCache {
    /// Create a cache for vectors produced by the provider identified by `provider_id`.
    pub fn new<S: Into<String>>(store: Arc<dyn CacheStore>, provider_id: S, ttl: Duration) -> Self {
        Self {
            store,
            namespace: provider_id.into(),
            ttl,
        }
    }

    /// The storage key for `text`.
    pub fn key_for(&self, text: &str) -> String {
        format!("embed:{}:{}", self.namespace, content_hash(text))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a previously stored vector for `text`.
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = self.key_for(text);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Embedding cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<Vec<f32>>(&raw) {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cached embedding");
                None
            }
        }
    }

    /// Store `vector` for `text`, replacing any previous entry.
    pub async fn set(&self, text: &str, vector: &[f32]) {
        let key = self.key_for(text);
        // Non-finite floats would be written as JSON null and never decode again.
        if vector.iter().any(|v| !v.is_finite()) {
            tracing::warn!(key = %key, "Skipping cache write for non-finite embedding");
            return;
        }
        let payload = match serde_json::to_string(vector) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping cache write for unencodable embedding");
                return;
            }
        };

        if let Err(e) = self.store.setex(&key, self.ttl.as_secs(), &payload).await {
            tracing::warn!(key = %key, error = %e, "Embedding cache write failed");
        }
    }
}
