//! Exact brute-force retrieval over an in-process corpus snapshot.
//!
//! The corpus (chunks and their vectors) lives in an immutable
//! [`CorpusSnapshot`] behind an `Arc`. A reload builds a complete new snapshot
//! first and then replaces the reference in one write, so a query always
//! ranks against exactly one generation: never a mix, never a half-built one.
//! Readers only hold the lock long enough to clone the `Arc`.
//!
//! Reloads are serialized internally, but callers should still avoid issuing
//! overlapping reloads: the last one to finish wins.

use super::{Retriever, read_corpus};
use crate::chunk::{Chunk, ScoredChunk};
use crate::error::{Result, RetrieverError};
use crate::similarity::cosine_similarity;
use async_trait::async_trait;
use quarry_context::{DEFAULT_MAX_WORDS, split_into_chunks};
use quarry_embed::Embedder;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// One loaded corpus. `vectors[i]` is the embedding of `chunks[i]`.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub generation: u64,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
}

/// Brute-force cosine retriever.
#[derive(Debug)]
pub struct InMemoryRetriever {
    embedder: Arc<Embedder>,
    max_words: usize,
    corpus: RwLock<Option<Arc<CorpusSnapshot>>>,
    reload_lock: Mutex<()>,
    generations: AtomicU64,
}

impl InMemoryRetriever {
    pub fn new(embedder: Arc<Embedder>) -> Self {
        Self {
            embedder,
            max_words: DEFAULT_MAX_WORDS,
            corpus: RwLock::new(None),
            reload_lock: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// Set the chunk size used by [`Retriever::load_from_file`] (builder style)
    pub fn with_max_words(self, max_words: usize) -> Self {
        Self { max_words, ..self }
    }

    /// The current snapshot, if a corpus has been loaded.
    pub async fn snapshot(&self) -> Option<Arc<CorpusSnapshot>> {
        self.corpus.read().await.clone()
    }

    /// Replace the corpus with already-chunked `passages` from `source`.
    ///
    /// Embedding happens before the swap; if it fails the previous corpus
    /// stays in place.
    pub async fn load_passages(&self, source: &str, passages: Vec<String>) -> Result<usize> {
        let _reload = self.reload_lock.lock().await;

        let vectors = self.embedder.embed_batch(&passages).await.inspect_err(|e| {
            tracing::error!("Failed to embed corpus from {}: {}", source, e);
        })?;

        let chunks: Vec<Chunk> = passages
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                id: format!("chunk_{index}"),
                text,
                source_index: index,
                source_file: source.to_string(),
            })
            .collect();

        let count = chunks.len();
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(CorpusSnapshot {
            generation,
            chunks,
            vectors,
        });

        *self.corpus.write().await = Some(snapshot);

        tracing::info!(
            "Loaded {} chunks from {} (generation {})",
            count,
            source,
            generation
        );
        Ok(count)
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn load_from_file(&self, path: &Path) -> Result<usize> {
        let text = read_corpus(path).await.inspect_err(|e| {
            tracing::error!("{}", e);
        })?;
        let passages = split_into_chunks(&text, self.max_words);
        self.load_passages(&path.display().to_string(), passages).await
    }

    async fn top_k_similar(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let snapshot = self
            .snapshot()
            .await
            .ok_or(RetrieverError::NotInitialized("no corpus has been loaded"))?;

        if snapshot.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;

        let mut scored: Vec<(usize, f32)> = snapshot
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, cosine_similarity(&query_vector, vector)))
            .collect();

        // Stable sort: equal scores keep corpus order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        tracing::debug!(
            "Ranked {} chunks for query, returning {}",
            snapshot.chunks.len(),
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(index, score)| ScoredChunk {
                chunk: snapshot.chunks[index].clone(),
                score,
            })
            .collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self
            .snapshot()
            .await
            .map(|snapshot| snapshot.chunks.len())
            .unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
