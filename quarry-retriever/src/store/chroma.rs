//! Chroma REST client

use super::{CollectionHandle, IndexParams, Metadata, StoreMatch, VectorRecord, VectorStore};
use crate::error::{Result, RetrieverError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// [`VectorStore`] backed by a Chroma server's v1 HTTP API.
#[derive(Debug, Clone)]
pub struct ChromaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a Metadata>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

/// Collection metadata carrying the HNSW parameters.
fn collection_metadata(params: &IndexParams) -> serde_json::Value {
    let mut metadata = json!({
        "hnsw:space": params.metric.as_str(),
        "hnsw:construction_ef": params.construction_ef,
        "hnsw:M": params.m,
    });
    if let (Some(search_ef), Some(map)) = (params.search_ef, metadata.as_object_mut()) {
        map.insert("hnsw:search_ef".to_string(), json!(search_ef));
    }
    metadata
}

/// Chroma `where` clause matching records whose `key` differs from `keep`.
fn not_equal_filter(key: &str, keep: &serde_json::Value) -> serde_json::Value {
    let mut filter = serde_json::Map::new();
    filter.insert(key.to_string(), json!({ "$ne": keep }));
    serde_json::Value::Object(filter)
}

/// Flatten the single-query response into ranked matches.
fn into_matches(response: QueryResponse) -> Result<Vec<StoreMatch>> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    if distances.len() != ids.len() {
        return Err(RetrieverError::external_store(format!(
            "query returned {} ids but {} distances",
            ids.len(),
            distances.len()
        )));
    }

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| StoreMatch {
            id,
            document: documents.get(i).cloned().flatten(),
            metadata: metadatas.get(i).cloned().flatten().unwrap_or_default(),
            distance: distances[i],
        })
        .collect())
}

impl ChromaClient {
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Check that the server is reachable.
    pub async fn heartbeat(&self) -> Result<()> {
        let response = self.client.get(self.url("/heartbeat")).send().await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(RetrieverError::external_store(format!("HTTP {status}: {snippet}")))
}

#[async_trait]
impl VectorStore for ChromaClient {
    async fn get_or_create_collection(
        &self,
        name: &str,
        params: &IndexParams,
    ) -> Result<CollectionHandle> {
        let response = self
            .client
            .post(self.url("/collections"))
            .json(&json!({
                "name": name,
                "metadata": collection_metadata(params),
                "get_or_create": true,
            }))
            .send()
            .await?;

        let collection: CollectionResponse = check_status(response).await?.json().await?;
        tracing::info!("Using Chroma collection {} ({})", collection.name, collection.id);
        Ok(CollectionHandle {
            id: collection.id,
            name: collection.name,
        })
    }

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        records: Vec<VectorRecord>,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let body = UpsertRequest {
            ids: records.iter().map(|r| r.id.as_str()).collect(),
            embeddings: records.iter().map(|r| r.embedding.as_slice()).collect(),
            documents: records.iter().map(|r| r.document.as_str()).collect(),
            metadatas: records.iter().map(|r| &r.metadata).collect(),
        };

        let response = self
            .client
            .post(self.url(&format!("/collections/{}/upsert", collection.id)))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        tracing::debug!("Upserted {} records into {}", records.len(), collection.name);
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<StoreMatch>> {
        let response = self
            .client
            .post(self.url(&format!("/collections/{}/query", collection.id)))
            .json(&QueryRequest {
                query_embeddings: [embedding],
                n_results: k,
                include: ["documents", "metadatas", "distances"],
            })
            .send()
            .await?;

        let parsed: QueryResponse = check_status(response).await?.json().await?;
        into_matches(parsed)
    }

    async fn delete_where_not(
        &self,
        collection: &CollectionHandle,
        key: &str,
        keep: &serde_json::Value,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/collections/{}/delete", collection.id)))
            .json(&json!({ "where": not_equal_filter(key, keep) }))
            .send()
            .await?;
        check_status(response).await?;

        tracing::debug!("Deleted records of {} where {} != {}", collection.name, key, keep);
        Ok(())
    }

    async fn count(&self, collection: &CollectionHandle) -> Result<usize> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{}/count", collection.id)))
            .send()
            .await?;
        Ok(check_status(response).await?.json::<usize>().await?)
    }
}
