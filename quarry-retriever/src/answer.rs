//! Question answering over the retriever.
//!
//! [`AnswerPipeline`] checks the [`ResponseCache`], retrieves supporting
//! passages, hands them to an [`AnswerGenerator`] and caches the result.
//! Prompt construction and the model call live behind the generator trait.

use crate::error::{Result, RetrieverError};
use crate::response_cache::ResponseCache;
use crate::retrieval::Retriever;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Produces an answer from retrieved context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Answer `question` using `context`, ordered most relevant first.
    async fn generate(
        &self,
        context: &[String],
        question: &str,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// An answer and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub response: String,
    /// True when served from the response cache without retrieval or generation.
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct AnswerPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn AnswerGenerator>,
    responses: ResponseCache,
    top_k: usize,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn AnswerGenerator>,
        responses: ResponseCache,
    ) -> Self {
        Self {
            retriever,
            generator,
            responses,
            top_k: crate::config::DEFAULT_TOP_K,
        }
    }

    /// Set how many passages are retrieved per question (builder style)
    pub fn with_top_k(self, top_k: usize) -> Self {
        Self { top_k, ..self }
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        if let Some(response) = self.responses.get(question).await {
            tracing::debug!("Serving cached answer");
            return Ok(Answer {
                response,
                cached: true,
                timestamp: Utc::now(),
            });
        }

        let passages = self.retriever.top_k_similar(question, self.top_k).await?;
        let context: Vec<String> = passages.into_iter().map(|p| p.chunk.text).collect();
        tracing::debug!("Generating answer from {} passages", context.len());

        let response = self
            .generator
            .generate(&context, question)
            .await
            .map_err(|e| RetrieverError::Generation(e.to_string()))?;

        self.responses.set(question, &response).await;

        Ok(Answer {
            response,
            cached: false,
            timestamp: Utc::now(),
        })
    }
}
