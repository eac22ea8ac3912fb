//! Embedder — pluggable text → vector collaborator.
//!
//! `AppState` holds an `Arc<dyn Embedder>`; the default is `OllamaEmbedder`.

use async_trait::async_trait;

use crate::llm_client::{LlmClient, LlmError};
use crate::rag::vector_index::Vector;

/// Maps text to a fixed-length vector. Same model and input must give the same vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, for logs and health output.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vector, LlmError>;
}

/// Embeddings served by an Ollama-compatible `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: LlmClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vector, LlmError> {
        self.client.embed(&self.model, text).await
    }
}
