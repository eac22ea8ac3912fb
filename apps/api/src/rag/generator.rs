//! Generator — pluggable prompt → text collaborator.

use async_trait::async_trait;

use crate::llm_client::{GenerationOptions, LlmClient, LlmError};

#[async_trait]
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Completions served by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: LlmClient,
    model: String,
    options: GenerationOptions,
}

impl OllamaGenerator {
    pub fn new(client: LlmClient, model: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            client,
            model: model.into(),
            options,
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.client.generate(&self.model, prompt, self.options).await
    }
}
