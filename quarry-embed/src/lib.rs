//! # quarry-embed
//!
//! Text embeddings for semantic retrieval, with a content-addressed cache in
//! front of every provider.
//!
//! ## Overview
//!
//! Embedding text is the expensive step of retrieval: a remote API call or a
//! local model inference per passage. This crate keeps that cost down by
//! hashing each text, remembering the resulting vector for a configurable
//! time, and only sending texts the cache has never seen (once each, even if
//! a batch repeats them) to the provider.
//!
//! ## Key Components
//!
//! - **[`EmbeddingProvider`]**: async trait for anything that maps text to vectors
//! - **[`RemoteEmbedProvider`]**: Cohere-compatible batch HTTP API
//! - **[`FastEmbedProvider`]**: local ONNX model via fastembed
//! - **[`CacheStore`]**: get / set-with-expiry storage, in memory or SQLite
//! - **[`EmbeddingCache`]**: vector cache keyed by `sha256(text)`, namespaced per provider
//! - **[`Embedder`]**: provider + cache with batch deduplication and timeouts
//!
//! ## Example
//!
//! ```rust,no_run
//! use quarry_embed::{CacheConfig, EmbedConfig, Embedder, build_provider, open_cache_store};
//!
//! # async fn example() -> quarry_embed::Result<()> {
//! let embed_config = EmbedConfig::from_env()?;
//! let cache_config = CacheConfig::from_env()?;
//!
//! let provider = build_provider(&embed_config).await?;
//! let store = open_cache_store(&cache_config)
//!     .await
//!     .map_err(|e| quarry_embed::EmbedError::invalid_config(e.to_string()))?;
//!
//! let embedder = Embedder::new(provider, store, cache_config.ttl)
//!     .with_timeout(embed_config.timeout);
//! let vectors = embedder
//!     .embed_batch(&["first passage".to_string(), "second passage".to_string()])
//!     .await?;
//! assert_eq!(vectors.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Policy
//!
//! Cache faults never fail a request: reads degrade to misses and writes are
//! dropped, both logged through `tracing`. Provider faults always fail the
//! request with an [`EmbedError`]; partial or placeholder vectors are never
//! returned.

pub mod cache;
pub mod config;
pub mod embedder;
pub mod error;
pub mod provider;
pub mod store;

pub use cache::{EmbeddingCache, content_hash};
pub use config::{CacheBackend, CacheConfig, EmbedConfig, LocalConfig, ProviderConfig, RemoteConfig};
pub use embedder::Embedder;
pub use error::{CacheError, EmbedError, Result};
pub use provider::{
    EmbeddingProvider, EmbeddingResult, FastEmbedProvider, InputType, RemoteEmbedProvider,
    build_provider,
};
pub use store::{CacheStore, MemoryCacheStore, SqliteCacheStore, open_cache_store};
