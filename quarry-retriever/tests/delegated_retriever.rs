//! Integration tests for the retriever backed by an external vector store

mod common;

use anyhow::Result;
use common::{FakeVectorStore, keyword_embedder, write_corpus};
use quarry_retriever::{
    DelegatedRetriever, IndexParams, Retriever, RetrieverError, VectorStore,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::tempdir;

const CORPUS: &str = "The sky is blue. Cats are mammals. Water boils at 100C.";

#[tokio::test]
async fn test_operations_fail_before_initialize() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_corpus(temp_dir.path(), "knowledge.txt", CORPUS);

    let store = Arc::new(FakeVectorStore::default());
    let (provider, embedder) = keyword_embedder();
    let retriever = DelegatedRetriever::new(store.clone(), embedder, "knowledge_base");

    assert!(!retriever.is_initialized().await);
    assert!(matches!(
        retriever.load_from_file(&path).await.unwrap_err(),
        RetrieverError::NotInitialized(_)
    ));
    assert!(matches!(
        retriever.top_k_similar("sky", 3).await.unwrap_err(),
        RetrieverError::NotInitialized(_)
    ));
    assert_eq!(retriever.chunk_count().await?, 0);
    assert_eq!(provider.texts_seen(), 0);
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_initialize_passes_index_params() -> Result<()> {
    let store = Arc::new(FakeVectorStore::default());
    let (_provider, embedder) = keyword_embedder();
    let params = IndexParams::default().with_construction_ef(100).with_m(8);
    let retriever =
        DelegatedRetriever::new(store.clone(), embedder, "docs").with_index_params(params);

    retriever.initialize().await?;
    retriever.initialize().await?;

    let created = store.created_with.lock().unwrap().clone();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].0, "docs");
    assert_eq!(created[0].1.construction_ef, 100);
    assert_eq!(created[0].1.m, 8);
    assert!(retriever.is_initialized().await);
    Ok(())
}

#[tokio::test]
async fn test_load_and_query_through_store() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_corpus(temp_dir.path(), "knowledge.txt", CORPUS);

    let store = Arc::new(FakeVectorStore::default());
    let (_provider, embedder) = keyword_embedder();
    let retriever =
        DelegatedRetriever::new(store.clone(), embedder, "knowledge_base").with_max_words(4);
    retriever.initialize().await?;

    assert_eq!(retriever.load_from_file(&path).await?, 3);
    assert_eq!(retriever.chunk_count().await?, 3);

    let handle = store
        .get_or_create_collection("knowledge_base", &IndexParams::default())
        .await?;
    let ids = store.ids(&handle);
    assert_eq!(ids.len(), 3);
    assert!(ids[0].starts_with("chunk_0_"));
    assert!(ids[2].starts_with("chunk_2_"));

    let results = retriever.top_k_similar("What color is the sky?", 1).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, "The sky is blue.");
    assert_eq!(results[0].chunk.source_index, 0);
    assert_eq!(results[0].chunk.source_file, path.display().to_string());
    assert!((results[0].score - 0.5).abs() < 1e-5);
    Ok(())
}

#[tokio::test]
async fn test_reload_replaces_previous_corpus() -> Result<()> {
    let temp_dir = tempdir()?;
    let first = write_corpus(temp_dir.path(), "first.txt", "The sky is blue.");
    let second = write_corpus(temp_dir.path(), "second.txt", "Cats are mammals. Water boils.");

    let store = Arc::new(FakeVectorStore::default());
    let (_provider, embedder) = keyword_embedder();
    let retriever =
        DelegatedRetriever::new(store.clone(), embedder, "knowledge_base").with_max_words(3);
    retriever.initialize().await?;

    assert_eq!(retriever.load_from_file(&first).await?, 2);
    assert_eq!(retriever.load_from_file(&second).await?, 2);
    assert_eq!(retriever.chunk_count().await?, 2);

    let results = retriever.top_k_similar("sky", 5).await?;
    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|r| r.chunk.source_file.ends_with("second.txt"))
    );

    // Reloading the same file must not leave duplicate passages behind.
    retriever.load_from_file(&second).await?;
    assert_eq!(retriever.chunk_count().await?, 2);
    let results = retriever.top_k_similar("cats", 3).await?;
    let mut texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), results.len());
    Ok(())
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_corpus() -> Result<()> {
    let temp_dir = tempdir()?;
    let first = write_corpus(temp_dir.path(), "first.txt", "The sky is blue.");
    let second = write_corpus(temp_dir.path(), "second.txt", "Cats are mammals.");

    let store = Arc::new(FakeVectorStore::default());
    let (_provider, embedder) = keyword_embedder();
    let retriever = DelegatedRetriever::new(store.clone(), embedder, "knowledge_base");
    retriever.initialize().await?;
    retriever.load_from_file(&first).await?;

    store.failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        retriever.load_from_file(&second).await.unwrap_err(),
        RetrieverError::ExternalStore(_)
    ));
    store.failing.store(false, Ordering::SeqCst);

    let results = retriever.top_k_similar("sky", 3).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, "The sky is blue.");
    assert!(results[0].chunk.source_file.ends_with("first.txt"));
    Ok(())
}

#[tokio::test]
async fn test_store_failures_surface_as_external_store() -> Result<()> {
    let store = Arc::new(FakeVectorStore::default());
    let (_provider, embedder) = keyword_embedder();
    let retriever = DelegatedRetriever::new(store.clone(), embedder, "knowledge_base");
    retriever.initialize().await?;

    store.failing.store(true, Ordering::SeqCst);
    let err = retriever.top_k_similar("sky", 3).await.unwrap_err();
    assert!(matches!(err, RetrieverError::ExternalStore(_)));
    Ok(())
}

#[tokio::test]
async fn test_failed_initialize_stays_uninitialized() -> Result<()> {
    let store = Arc::new(FakeVectorStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let (_provider, embedder) = keyword_embedder();
    let retriever = DelegatedRetriever::new(store.clone(), embedder, "knowledge_base");

    assert!(retriever.initialize().await.is_err());
    assert!(!retriever.is_initialized().await);
    assert_eq!(retriever.backend_name(), "delegated");
    Ok(())
}
