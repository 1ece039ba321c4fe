//! Approximate retrieval delegated to an external vector store.
//!
//! Vectors are computed locally through the cached [`Embedder`] and shipped to
//! the store; ranking happens on the store's ANN index. Only the collection
//! handle is held in process.
//!
//! Each load upserts a new generation of ids (`chunk_{index}_{load_ms}`),
//! tagged with `load_ms` in the record metadata. Once every batch of the new
//! generation is stored, records from any other generation are deleted. A
//! failed load leaves the previous generation in place. Between the upsert and
//! the delete a query may see both generations.

use super::{Retriever, read_corpus};
use crate::chunk::{Chunk, ScoredChunk};
use crate::error::{Result, RetrieverError};
use crate::store::{
    CollectionHandle, DistanceMetric, IndexParams, Metadata, StoreMatch, VectorRecord,
    VectorStore,
};
use async_trait::async_trait;
use quarry_context::{DEFAULT_MAX_WORDS, split_into_chunks};
use quarry_embed::Embedder;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Records sent to the store per upsert request.
const UPSERT_BATCH_SIZE: usize = 256;

/// Metadata key holding the load generation of a record.
const GENERATION_KEY: &str = "load_ms";

/// Retriever backed by a [`VectorStore`].
pub struct DelegatedRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<Embedder>,
    collection_name: String,
    index_params: IndexParams,
    max_words: usize,
    collection: RwLock<Option<CollectionHandle>>,
}

impl std::fmt::Debug for DelegatedRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedRetriever")
            .field("collection_name", &self.collection_name)
            .field("index_params", &self.index_params)
            .field("max_words", &self.max_words)
            .finish()
    }
}

impl DelegatedRetriever {
    /// Create a retriever for collection `collection_name`.
    ///
    /// Nothing is contacted until [`DelegatedRetriever::initialize`].
    pub fn new<S: Into<String>>(
        store: Arc<dyn VectorStore>,
        embedder: Arc<Embedder>,
        collection_name: S,
    ) -> Self {
        Self {
            store,
            embedder,
            collection_name: collection_name.into(),
            index_params: IndexParams::default(),
            max_words: DEFAULT_MAX_WORDS,
            collection: RwLock::new(None),
        }
    }

    /// Set the index parameters used if the collection must be created (builder style)
    pub fn with_index_params(self, index_params: IndexParams) -> Self {
        Self {
            index_params,
            ..self
        }
    }

    /// Set the chunk size (builder style)
    pub fn with_max_words(self, max_words: usize) -> Self {
        Self { max_words, ..self }
    }

    /// Provision the collection. Safe to call more than once.
    pub async fn initialize(&self) -> Result<()> {
        let handle = self
            .store
            .get_or_create_collection(&self.collection_name, &self.index_params)
            .await?;
        *self.collection.write().await = Some(handle);
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.collection.read().await.is_some()
    }

    async fn handle(&self) -> Result<CollectionHandle> {
        self.collection
            .read()
            .await
            .clone()
            .ok_or(RetrieverError::NotInitialized(
                "vector store collection has not been initialized",
            ))
    }

    fn to_scored(&self, found: StoreMatch) -> ScoredChunk {
        let source_index = found
            .metadata
            .get("chunk_index")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;
        let source_file = found
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let score = match self.index_params.metric {
            DistanceMetric::Cosine | DistanceMetric::Ip => 1.0 - found.distance,
            DistanceMetric::L2 => -found.distance,
        };

        ScoredChunk {
            chunk: Chunk {
                id: found.id,
                text: found.document.unwrap_or_default(),
                source_index,
                source_file,
            },
            score,
        }
    }
}

#[async_trait]
impl Retriever for DelegatedRetriever {
    async fn load_from_file(&self, path: &Path) -> Result<usize> {
        let handle = self.handle().await?;
        let text = read_corpus(path).await?;
        let passages = split_into_chunks(&text, self.max_words);
        let vectors = self.embedder.embed_batch(&passages).await?;

        let source = path.display().to_string();
        let load_ms = chrono::Utc::now().timestamp_millis();
        let count = passages.len();

        let records: Vec<VectorRecord> = passages
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (document, embedding))| {
                let mut metadata = Metadata::new();
                metadata.insert("chunk_index".to_string(), json!(index));
                metadata.insert("source".to_string(), json!(source));
                metadata.insert(GENERATION_KEY.to_string(), json!(load_ms));
                VectorRecord {
                    id: format!("chunk_{index}_{load_ms}"),
                    embedding,
                    document,
                    metadata,
                }
            })
            .collect();

        let mut remaining = records;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(UPSERT_BATCH_SIZE));
            self.store.upsert(&handle, remaining).await?;
            remaining = rest;
        }

        self.store
            .delete_where_not(&handle, GENERATION_KEY, &json!(load_ms))
            .await?;

        tracing::info!(
            "Upserted {} chunks from {} into collection {}",
            count,
            source,
            handle.name
        );
        Ok(count)
    }

    async fn top_k_similar(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let handle = self.handle().await?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;
        let matches = self.store.query(&handle, &query_vector, k).await?;

        Ok(matches
            .into_iter()
            .take(k)
            .map(|found| self.to_scored(found))
            .collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        match self.collection.read().await.clone() {
            Some(handle) => self.store.count(&handle).await,
            None => Ok(0),
        }
    }

    fn backend_name(&self) -> &'static str {
        "delegated"
    }
}
