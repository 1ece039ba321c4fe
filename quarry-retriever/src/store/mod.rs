//! External vector store abstraction
//!
//! The delegated retriever keeps no vectors locally. It talks to an
//! approximate nearest-neighbour service through [`VectorStore`], holding
//! only a [`CollectionHandle`].

pub mod chroma;

pub use chroma::ChromaClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance function the index is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Ip,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::Ip => "ip",
        }
    }
}

/// HNSW index parameters used when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    pub metric: DistanceMetric,
    /// Candidate list size while building the graph.
    pub construction_ef: usize,
    /// Maximum neighbours per graph node.
    pub m: usize,
    /// Candidate list size while searching; store default when `None`.
    pub search_ef: Option<usize>,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            construction_ef: 200,
            m: 16,
            search_ef: None,
        }
    }
}

impl IndexParams {
    /// Set the construction breadth (builder style)
    pub fn with_construction_ef(self, construction_ef: usize) -> Self {
        Self {
            construction_ef,
            ..self
        }
    }

    /// Set the graph degree (builder style)
    pub fn with_m(self, m: usize) -> Self {
        Self { m, ..self }
    }

    /// Set the search breadth (builder style)
    pub fn with_search_ef(self, search_ef: usize) -> Self {
        Self {
            search_ef: Some(search_ef),
            ..self
        }
    }
}

/// Reference to a collection held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    pub id: String,
    pub name: String,
}

/// Metadata stored next to each vector.
pub type Metadata = HashMap<String, serde_json::Value>;

/// One vector to insert or replace.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Metadata,
}

/// One query result, in the store's ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMatch {
    pub id: String,
    pub document: Option<String>,
    pub metadata: Metadata,
    /// Distance under the collection's metric; smaller is closer.
    pub distance: f32,
}

/// Operations the delegated retriever needs from an ANN service.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the named collection, creating it with `params` if it does not exist.
    async fn get_or_create_collection(
        &self,
        name: &str,
        params: &IndexParams,
    ) -> Result<CollectionHandle>;

    /// Insert or replace records by id.
    async fn upsert(&self, collection: &CollectionHandle, records: Vec<VectorRecord>)
    -> Result<()>;

    /// Up to `k` nearest records to `embedding`, closest first.
    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<StoreMatch>>;

    /// Remove every record whose metadata value under `key` is not `keep`.
    async fn delete_where_not(
        &self,
        collection: &CollectionHandle,
        key: &str,
        keep: &serde_json::Value,
    ) -> Result<()>;

    /// Number of records in the collection.
    async fn count(&self, collection: &CollectionHandle) -> Result<usize>;
}
