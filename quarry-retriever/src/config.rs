//! Retriever configuration

use crate::error::{Result, RetrieverError};
use crate::store::IndexParams;
use quarry_context::DEFAULT_MAX_WORDS;
use std::path::PathBuf;
use std::time::Duration;

/// Number of passages returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 3;

/// Connection and index settings for a Chroma server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaConfig {
    pub url: String,
    pub collection: String,
    pub index: IndexParams,
    /// Bound on every HTTP request to the server.
    pub timeout: Duration,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            collection: "knowledge_base".to_string(),
            index: IndexParams::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Which retriever implementation to build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetrieverBackend {
    /// Exact search over an in-process index.
    #[default]
    InMemory,
    /// Approximate search delegated to a Chroma server.
    Chroma(ChromaConfig),
}

/// Configuration for corpus loading and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieverConfig {
    pub backend: RetrieverBackend,
    /// Corpus file loaded at startup.
    pub knowledge_path: PathBuf,
    /// Words per chunk.
    pub max_words: usize,
    /// Passages returned when a query does not say how many.
    pub top_k: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            backend: RetrieverBackend::InMemory,
            knowledge_path: PathBuf::from("knowledge.txt"),
            max_words: DEFAULT_MAX_WORDS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RetrieverConfig {
    /// Set the backend (builder style)
    pub fn with_backend(self, backend: RetrieverBackend) -> Self {
        Self { backend, ..self }
    }

    /// Set the corpus path (builder style)
    pub fn with_knowledge_path<P: Into<PathBuf>>(self, knowledge_path: P) -> Self {
        Self {
            knowledge_path: knowledge_path.into(),
            ..self
        }
    }

    /// Set the chunk size in words (builder style)
    pub fn with_max_words(self, max_words: usize) -> Self {
        Self { max_words, ..self }
    }

    /// Set the default result count (builder style)
    pub fn with_top_k(self, top_k: usize) -> Self {
        Self { top_k, ..self }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `USE_CHROMADB=true` selects the Chroma backend, configured by
    /// `CHROMA_URL`, `CHROMA_COLLECTION`, `CHROMA_HNSW_EF`, `CHROMA_HNSW_M`
    /// and `CHROMA_SEARCH_EF`. `KNOWLEDGE_PATH`, `CHUNK_MAX_WORDS` and
    /// `TOP_K` apply to both backends.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let use_chroma = lookup("USE_CHROMADB")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        if use_chroma {
            let mut chroma = ChromaConfig::default();
            if let Some(url) = lookup("CHROMA_URL") {
                chroma.url = url;
            }
            if let Some(collection) = lookup("CHROMA_COLLECTION") {
                chroma.collection = collection;
            }
            if let Some(ef) = parse_var::<usize>(&lookup, "CHROMA_HNSW_EF")? {
                chroma.index = chroma.index.with_construction_ef(ef);
            }
            if let Some(m) = parse_var::<usize>(&lookup, "CHROMA_HNSW_M")? {
                chroma.index = chroma.index.with_m(m);
            }
            if let Some(search_ef) = parse_var::<usize>(&lookup, "CHROMA_SEARCH_EF")? {
                chroma.index = chroma.index.with_search_ef(search_ef);
            }
            config = config.with_backend(RetrieverBackend::Chroma(chroma));
        }

        if let Some(path) = lookup("KNOWLEDGE_PATH") {
            config = config.with_knowledge_path(path);
        }
        if let Some(max_words) = parse_var::<usize>(&lookup, "CHUNK_MAX_WORDS")? {
            config = config.with_max_words(max_words);
        }
        if let Some(top_k) = parse_var::<usize>(&lookup, "TOP_K")? {
            config = config.with_top_k(top_k);
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RetrieverError::InvalidConfig(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
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
    fn test_defaults() {
        let config = RetrieverConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, RetrieverConfig::default());
        assert_eq!(config.backend, RetrieverBackend::InMemory);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_words, 250);
        assert_eq!(config.knowledge_path, PathBuf::from("knowledge.txt"));
    }

    #[test]
    fn test_chroma_settings() {
        let config = RetrieverConfig::from_lookup(lookup_from(&[
            ("USE_CHROMADB", "true"),
            ("CHROMA_URL", "http://chroma:8000"),
            ("CHROMA_HNSW_EF", "100"),
            ("CHROMA_HNSW_M", "32"),
        ]))
        .unwrap();

        let RetrieverBackend::Chroma(chroma) = config.backend else {
            panic!("expected chroma backend");
        };
        assert_eq!(chroma.url, "http://chroma:8000");
        assert_eq!(chroma.collection, "knowledge_base");
        assert_eq!(chroma.index.construction_ef, 100);
        assert_eq!(chroma.index.m, 32);
        assert_eq!(chroma.index.search_ef, None);
    }

    #[test]
    fn test_chroma_settings_ignored_without_flag() {
        let config = RetrieverConfig::from_lookup(lookup_from(&[
            ("USE_CHROMADB", "false"),
            ("CHROMA_HNSW_EF", "100"),
        ]))
        .unwrap();
        assert_eq!(config.backend, RetrieverBackend::InMemory);
    }

    #[test]
    fn test_shared_settings() {
        let config = RetrieverConfig::from_lookup(lookup_from(&[
            ("KNOWLEDGE_PATH", "/data/kb.txt"),
            ("CHUNK_MAX_WORDS", "120"),
            ("TOP_K", "5"),
        ]))
        .unwrap();

        assert_eq!(config.knowledge_path, PathBuf::from("/data/kb.txt"));
        assert_eq!(config.max_words, 120);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_invalid_number() {
        let err = RetrieverConfig::from_lookup(lookup_from(&[("TOP_K", "three")])).unwrap_err();
        assert!(matches!(err, RetrieverError::InvalidConfig(_)));
    }
}
