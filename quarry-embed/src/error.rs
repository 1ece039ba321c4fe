//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for provider calls and the cached embedding path.
///
/// Every variant describes a failure that must reach the caller: the embedder
/// never substitutes partial or zero vectors when one of these occurs.
///
/// # Error Categories
///
/// - **Configuration Errors**: invalid provider or model settings
/// - **Provider Errors**: the remote API or local model failed or misbehaved
/// - **Contract Errors**: the provider returned the wrong number or shape of vectors
/// - **IO Errors**: file system and task failures
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when provider configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The provider failed while producing embeddings
    #[error("Embedding provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// The provider did not answer within the configured bound
    #[error("Embedding provider '{provider}' timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    /// The provider returned a different number of vectors than it was given texts
    #[error("Embedding provider returned {actual} vectors for {expected} texts")]
    CountMismatch { expected: usize, actual: usize },

    /// A returned vector does not have the provider's fixed dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Transport errors talking to a remote provider
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// IO errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create a provider failure with a descriptive message.
    pub fn provider<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    ///
    /// # Arguments
    /// * `message` - A descriptive error message explaining what's wrong with the configuration
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Failures of the key/value cache storage.
///
/// These never escape the caches built on top of the storage: a failed read
/// is reported as a miss and a failed write is dropped, both with a warning.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The storage backend rejected the operation
    #[error("Cache backend error: {message}")]
    Backend { message: String },

    /// SQLite storage errors
    #[error("Cache database error: {source}")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },
}

impl CacheError {
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
