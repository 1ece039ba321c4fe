//! Shared stubs for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use quarry_embed::{Embedder, EmbeddingProvider, EmbeddingResult, MemoryCacheStore};
use quarry_retriever::{
    CollectionHandle, IndexParams, Result, RetrieverError, StoreMatch, VectorRecord, VectorStore,
    cosine_similarity,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const VOCABULARY: &[&str] = &["sky", "blue", "color", "cat", "mammal", "water", "boil"];

/// Bag-of-keywords provider: component `i` counts words starting with `VOCABULARY[i]`.
#[derive(Default)]
pub struct KeywordProvider {
    texts_seen: AtomicUsize,
}

impl KeywordProvider {
    pub fn texts_seen(&self) -> usize {
        self.texts_seen.load(Ordering::SeqCst)
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len()];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            for (i, keyword) in VOCABULARY.iter().enumerate() {
                if word.starts_with(keyword) {
                    vector[i] += 1.0;
                }
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed_texts(&self, texts: &[String]) -> quarry_embed::Result<EmbeddingResult> {
        self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| Self::vectorize(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn provider_name(&self) -> &str {
        "keyword"
    }
}

pub fn keyword_embedder() -> (Arc<KeywordProvider>, Arc<Embedder>) {
    let provider = Arc::new(KeywordProvider::default());
    let embedder = Embedder::new(
        provider.clone(),
        Arc::new(MemoryCacheStore::new()),
        Duration::from_secs(3600),
    );
    (provider, Arc::new(embedder))
}

pub fn write_corpus(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write corpus file");
    path
}

/// Exact-search stand-in for an ANN service, using cosine distance.
#[derive(Default)]
pub struct FakeVectorStore {
    collections: Mutex<HashMap<String, Vec<VectorRecord>>>,
    pub created_with: Mutex<Vec<(String, IndexParams)>>,
    pub upsert_calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeVectorStore {
    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RetrieverError::external_store("store unavailable"));
        }
        Ok(())
    }

    pub fn ids(&self, collection: &CollectionHandle) -> Vec<String> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection.id)
            .map(|records| records.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        params: &IndexParams,
    ) -> Result<CollectionHandle> {
        self.check()?;
        self.created_with
            .lock()
            .unwrap()
            .push((name.to_string(), *params));
        let id = format!("id-{name}");
        self.collections
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default();
        Ok(CollectionHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn upsert(&self, collection: &CollectionHandle, records: Vec<VectorRecord>) -> Result<()> {
        self.check()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection.id.clone()).or_default();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<StoreMatch>> {
        self.check()?;
        let collections = self.collections.lock().unwrap();
        let mut matches: Vec<StoreMatch> = collections
            .get(&collection.id)
            .map(|records| records.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|r| StoreMatch {
                id: r.id.clone(),
                document: Some(r.document.clone()),
                metadata: r.metadata.clone(),
                distance: 1.0 - cosine_similarity(embedding, &r.embedding),
            })
            .collect();
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);
        Ok(matches)
    }

    async fn delete_where_not(
        &self,
        collection: &CollectionHandle,
        key: &str,
        keep: &serde_json::Value,
    ) -> Result<()> {
        self.check()?;
        if let Some(records) = self.collections.lock().unwrap().get_mut(&collection.id) {
            records.retain(|r| r.metadata.get(key) == Some(keep));
        }
        Ok(())
    }

    async fn count(&self, collection: &CollectionHandle) -> Result<usize> {
        self.check()?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(&collection.id)
            .map(|records| records.len())
            .unwrap_or(0))
    }
}
