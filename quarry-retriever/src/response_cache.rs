//! Cache of generated answers keyed by question text.
//!
//! Uses the same storage and failure policy as the embedding cache: keys are
//! `chat:{sha256(question)}`, entries expire after the configured TTL, and
//! storage faults are logged and otherwise ignored.

use quarry_embed::{CacheStore, content_hash};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.store.backend_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn key_for(question: &str) -> String {
        format!("chat:{}", content_hash(question))
    }

    pub async fn get(&self, question: &str) -> Option<String> {
        let key = Self::key_for(question);
        match self.store.get(&key).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Response cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, question: &str, answer: &str) {
        let key = Self::key_for(question);
        if let Err(e) = self.store.setex(&key, self.ttl.as_secs(), answer).await {
            tracing::warn!(key = %key, error = %e, "Response cache write failed");
        }
    }
}
