//! Error types for retrieval

use quarry_embed::EmbedError;
use std::path::PathBuf;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Errors surfaced by retrievers and the answer pipeline.
///
/// Cache faults never appear here; the caches absorb them.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// The corpus file could not be read. The previously loaded corpus is untouched.
    #[error("Failed to load corpus from {path}: {source}")]
    CorpusLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Embedding failed; no partial index or ranking was produced.
    #[error("Embedding failed: {0}")]
    Provider(#[from] EmbedError),

    /// The retriever was queried or loaded before it was ready.
    #[error("Retriever not initialized: {0}")]
    NotInitialized(&'static str),

    /// The external vector store failed or returned something unusable.
    #[error("Vector store error: {0}")]
    ExternalStore(String),

    /// The answer generator failed.
    #[error("Answer generation failed: {0}")]
    Generation(String),

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RetrieverError {
    pub fn external_store<S: Into<String>>(message: S) -> Self {
        Self::ExternalStore(message.into())
    }
}

impl From<reqwest::Error> for RetrieverError {
    fn from(error: reqwest::Error) -> Self {
        Self::ExternalStore(error.to_string())
    }
}
