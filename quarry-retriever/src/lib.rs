//! quarry-retriever: semantic passage retrieval over a text corpus
//!
//! This crate loads a plain-text corpus, splits it into passages, embeds them
//! through the cached [`quarry_embed::Embedder`] and ranks passages against
//! free-text queries by cosine similarity.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: the [`Retriever`] contract with exact in-memory and
//!   delegated (external ANN store) implementations
//! - **[`store`]**: the [`VectorStore`] abstraction and its Chroma client
//! - **[`similarity`]**: cosine scoring
//! - **[`response_cache`]** / **[`answer`]**: cached question answering on top
//!   of a retriever
//! - **[`config`]**: environment-driven configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry_embed::{CacheConfig, EmbedConfig, Embedder, build_provider, open_cache_store};
//! use quarry_retriever::{RetrieverConfig, build_retriever};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let embed_config = EmbedConfig::from_env()?;
//! let cache_config = CacheConfig::from_env()?;
//! let config = RetrieverConfig::from_env()?;
//!
//! let provider = build_provider(&embed_config).await?;
//! let store = open_cache_store(&cache_config).await?;
//! let embedder = Arc::new(Embedder::new(provider, store, cache_config.ttl));
//!
//! let retriever = build_retriever(&config, embedder).await?;
//! retriever.load_from_file(&config.knowledge_path).await?;
//! for hit in retriever.top_k_similar("What color is the sky?", 3).await? {
//!     println!("{:.3} {}", hit.score, hit.chunk.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! corpus file → chunker → Embedder (cache ⇄ provider) → Retriever index
//!                                                          ↑
//! query ──────────────→ Embedder ─────────────→ top_k_similar → ranked chunks
//! ```

pub mod answer;
pub mod chunk;
pub mod config;
pub mod error;
pub mod response_cache;
pub mod retrieval;
pub mod similarity;
pub mod store;

pub use answer::{Answer, AnswerGenerator, AnswerPipeline};
pub use chunk::{Chunk, ScoredChunk};
pub use config::{ChromaConfig, DEFAULT_TOP_K, RetrieverBackend, RetrieverConfig};
pub use error::{Result, RetrieverError};
pub use response_cache::ResponseCache;
pub use retrieval::{DelegatedRetriever, InMemoryRetriever, Retriever, build_retriever};
pub use similarity::cosine_similarity;
pub use store::{
    ChromaClient, CollectionHandle, DistanceMetric, IndexParams, StoreMatch, VectorRecord,
    VectorStore,
};
