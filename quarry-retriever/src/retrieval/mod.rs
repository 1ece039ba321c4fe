//! Retriever implementations
//!
//! Two retrievers share the [`Retriever`] contract:
//!
//! - [`InMemoryRetriever`]: exact, brute-force cosine ranking over an
//!   in-process snapshot of the corpus.
//! - [`DelegatedRetriever`]: approximate ranking delegated to an external
//!   [`VectorStore`](crate::store::VectorStore) such as Chroma.
//!
//! The implementation is picked once, at construction, by [`build_retriever`].

pub mod delegated;
pub mod in_memory;

pub use delegated::DelegatedRetriever;
pub use in_memory::InMemoryRetriever;

use crate::chunk::ScoredChunk;
use crate::config::{RetrieverBackend, RetrieverConfig};
use crate::error::{Result, RetrieverError};
use crate::store::ChromaClient;
use async_trait::async_trait;
use quarry_embed::Embedder;
use std::path::Path;
use std::sync::Arc;

/// Load a corpus and rank its passages against free-text queries.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Replace the corpus with the contents of `path`, returning the chunk count.
    async fn load_from_file(&self, path: &Path) -> Result<usize>;

    /// The `k` passages most similar to `query`, best first.
    async fn top_k_similar(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of passages currently searchable.
    async fn chunk_count(&self) -> Result<usize>;

    /// Short implementation name for logs and status output.
    fn backend_name(&self) -> &'static str;
}

/// Read a corpus file, mapping failures to [`RetrieverError::CorpusLoad`].
pub(crate) async fn read_corpus(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RetrieverError::CorpusLoad {
            path: path.to_path_buf(),
            source,
        })
}

/// Build the retriever selected by `config`.
///
/// The Chroma backend is checked for reachability and initialized (its
/// collection provisioned) before it is returned, so the result is ready for
/// [`Retriever::load_from_file`].
pub async fn build_retriever(
    config: &RetrieverConfig,
    embedder: Arc<Embedder>,
) -> Result<Arc<dyn Retriever>> {
    match &config.backend {
        RetrieverBackend::InMemory => {
            tracing::info!("Using in-memory retriever");
            Ok(Arc::new(
                InMemoryRetriever::new(embedder).with_max_words(config.max_words),
            ))
        }
        RetrieverBackend::Chroma(chroma) => {
            tracing::info!("Using Chroma retriever at {}", chroma.url);
            let client = ChromaClient::new(chroma.url.clone(), chroma.timeout)?;
            client.heartbeat().await?;
            let retriever = DelegatedRetriever::new(Arc::new(client), embedder, &chroma.collection)
                .with_index_params(chroma.index)
                .with_max_words(config.max_words);
            retriever.initialize().await?;
            Ok(Arc::new(retriever))
        }
    }
}
