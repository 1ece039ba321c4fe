//! Configuration for embedding providers and the embedding cache

use crate::error::{EmbedError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default model for the remote batch provider.
pub const DEFAULT_REMOTE_MODEL: &str = "embed-english-v3.0";
/// Default base URL for the remote batch provider.
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.cohere.ai";
/// Largest batch the remote API accepts in one request.
pub const DEFAULT_REMOTE_MAX_BATCH: usize = 96;
/// Output dimension of [`DEFAULT_REMOTE_MODEL`].
pub const DEFAULT_REMOTE_DIMENSION: usize = 1024;
/// Default model for the local provider.
pub const DEFAULT_LOCAL_MODEL: &str = "Xenova/all-MiniLM-L6-v2";
/// Default bound on a single provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default lifetime of cache entries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Settings for the remote batch embedding API.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Texts per HTTP request; larger inputs are split into sub-batches.
    pub max_batch_size: usize,
    /// Dimension of the vectors the model returns.
    pub dimension: usize,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_batch_size", &self.max_batch_size)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl RemoteConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_REMOTE_MODEL.to_string(),
            base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            max_batch_size: DEFAULT_REMOTE_MAX_BATCH,
            dimension: DEFAULT_REMOTE_DIMENSION,
        }
    }

    /// Set the model name (builder style)
    pub fn with_model<S: Into<String>>(self, model: S) -> Self {
        Self {
            model: model.into(),
            ..self
        }
    }

    /// Set the API base URL (builder style)
    pub fn with_base_url<S: Into<String>>(self, base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..self
        }
    }

    /// Set the per-request batch limit (builder style)
    pub fn with_max_batch_size(self, max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            ..self
        }
    }

    /// Set the expected output dimension (builder style)
    pub fn with_dimension(self, dimension: usize) -> Self {
        Self { dimension, ..self }
    }
}

/// Settings for the local ONNX model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Model identifier, e.g. `Xenova/all-MiniLM-L6-v2`.
    pub model_name: String,
    /// Directory where downloaded model files are kept.
    pub cache_dir: Option<PathBuf>,
    /// Texts handed to one inference call.
    pub batch_size: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_LOCAL_MODEL.to_string(),
            cache_dir: None,
            batch_size: 16,
        }
    }
}

impl LocalConfig {
    /// Set the model name (builder style)
    pub fn with_model_name<S: Into<String>>(self, model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    /// Set the model download directory (builder style)
    pub fn with_cache_dir<P: Into<PathBuf>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..self
        }
    }

    /// Set the inference batch size (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            ..self
        }
    }
}

/// Which embedding provider to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Remote(RemoteConfig),
    Local(LocalConfig),
}

/// Configuration for embedding generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    pub provider: ProviderConfig,
    /// Upper bound on a single provider call.
    pub timeout: Duration,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::Local(LocalConfig::default()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EmbedConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the provider call timeout (builder style)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Load configuration from the process environment.
    ///
    /// See [`EmbedConfig::from_lookup`] for the recognised variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// A non-empty `COHERE_API_KEY` selects the remote provider, tuned by
    /// `COHERE_MODEL`, `COHERE_BASE_URL`, `COHERE_MAX_BATCH` and
    /// `COHERE_DIMENSION`. Otherwise the local provider runs
    /// `HUGGINGFACE_MODEL`, keeping downloads under `TRANSFORMERS_CACHE` or
    /// `HF_HOME`. `EMBED_TIMEOUT_SECS` bounds each provider call.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("COHERE_API_KEY").filter(|k| !k.trim().is_empty());

        let provider = match api_key {
            Some(api_key) => {
                let mut remote = RemoteConfig::new(api_key);
                if let Some(model) = lookup("COHERE_MODEL") {
                    remote = remote.with_model(model);
                }
                if let Some(base_url) = lookup("COHERE_BASE_URL") {
                    remote = remote.with_base_url(base_url);
                }
                if let Some(max_batch) = parse_var::<usize>(&lookup, "COHERE_MAX_BATCH")? {
                    remote = remote.with_max_batch_size(max_batch);
                }
                if let Some(dimension) = parse_var::<usize>(&lookup, "COHERE_DIMENSION")? {
                    remote = remote.with_dimension(dimension);
                }
                ProviderConfig::Remote(remote)
            }
            None => {
                let mut local = LocalConfig::default();
                if let Some(model) = lookup("HUGGINGFACE_MODEL") {
                    local = local.with_model_name(model);
                }
                if let Some(dir) = lookup("TRANSFORMERS_CACHE").or_else(|| lookup("HF_HOME")) {
                    local = local.with_cache_dir(dir);
                }
                ProviderConfig::Local(local)
            }
        };

        let mut config = Self::new(provider);
        if let Some(secs) = parse_var::<u64>(&lookup, "EMBED_TIMEOUT_SECS")? {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// Where cache entries are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Sqlite(PathBuf),
}

/// Configuration shared by the embedding and response caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl CacheConfig {
    /// Set the entry lifetime (builder style)
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// Store entries in a SQLite database at `path` (builder style)
    pub fn with_sqlite<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            backend: CacheBackend::Sqlite(path.into()),
            ..self
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `CACHE_TTL_SECONDS` and `CACHE_DB_PATH`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = parse_var::<u64>(&lookup, "CACHE_TTL_SECONDS")? {
            config = config.with_ttl(Duration::from_secs(secs));
        }
        if let Some(path) = lookup("CACHE_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config = config.with_sqlite(path);
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EmbedError::invalid_config(format!("{key}={raw:?}: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_select_local_provider() {
        let config = EmbedConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.timeout, Duration::from_secs(30));
        match config.provider {
            ProviderConfig::Local(local) => {
                assert_eq!(local.model_name, "Xenova/all-MiniLM-L6-v2");
                assert!(local.cache_dir.is_none());
            }
            other => panic!("expected local provider, got {other:?}"),
        }
    }

    #[test]
    fn test_api_key_selects_remote_provider() {
        let config = EmbedConfig::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "secret"),
            ("COHERE_MAX_BATCH", "10"),
            ("EMBED_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(5));
        match config.provider {
            ProviderConfig::Remote(remote) => {
                assert_eq!(remote.api_key, "secret");
                assert_eq!(remote.model, "embed-english-v3.0");
                assert_eq!(remote.max_batch_size, 10);
                assert_eq!(remote.dimension, 1024);
            }
            other => panic!("expected remote provider, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config = EmbedConfig::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "  "),
            ("HUGGINGFACE_MODEL", "BAAI/bge-small-en-v1.5"),
            ("HF_HOME", "/tmp/models"),
        ]))
        .unwrap();

        assert_eq!(
            config.provider,
            ProviderConfig::Local(
                LocalConfig::default()
                    .with_model_name("BAAI/bge-small-en-v1.5")
                    .with_cache_dir("/tmp/models")
            )
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = EmbedConfig::from_lookup(lookup_from(&[("EMBED_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));

        let err =
            CacheConfig::from_lookup(lookup_from(&[("CACHE_TTL_SECONDS", "-1")])).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECONDS"));
    }

    #[test]
    fn test_cache_config() {
        let config = CacheConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(config.ttl, Duration::from_secs(3600));

        let config = CacheConfig::from_lookup(lookup_from(&[
            ("CACHE_TTL_SECONDS", "60"),
            ("CACHE_DB_PATH", "cache.db"),
        ]))
        .unwrap();
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.backend, CacheBackend::Sqlite(PathBuf::from("cache.db")));
    }

    #[test]
    fn test_remote_config_debug_hides_key() {
        let remote = RemoteConfig::new("very-secret");
        assert!(!format!("{remote:?}").contains("very-secret"));
    }
}
