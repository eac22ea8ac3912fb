/// LLM Client — the single point of entry for all model-server calls in docchat.
///
/// Talks to an Ollama-compatible HTTP server. Embedding and generation collaborators
/// (`rag::embedder`, `rag::generator`) wrap this client; nothing else issues model requests.
///
/// No retries are performed here. A failed call is reported once and the caller decides.
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const EMBEDDINGS_PATH: &str = "/api/embeddings";
const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("Request to the model server timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Parse(e.to_string())
        } else {
            LlmError::Http(e)
        }
    }
}

/// Sampling options forwarded to `/api/generate`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    pub eval_count: Option<u32>,
    pub prompt_eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// The single model-server client shared by the embedder and generator.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
}

impl LlmClient {
    pub fn new(base_url: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embeds a single text with the given embedding model.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, EMBEDDINGS_PATH))
            .json(&EmbeddingRequest {
                model,
                prompt: text,
            })
            .send()
            .await?;

        let body: EmbeddingResponse = check_status(response).await?.json().await?;
        if body.embedding.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(model, dimension = body.embedding.len(), "embedding call succeeded");
        Ok(body.embedding)
    }

    /// Runs a single non-streaming completion and returns the generated text.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, GENERATE_PATH))
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
                options,
            })
            .send()
            .await?;

        let body: GenerateResponse = check_status(response).await?.json().await?;

        debug!(
            "generation call succeeded: prompt_tokens={:?}, output_tokens={:?}",
            body.prompt_eval_count, body.eval_count
        );

        let text = body.response.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }

    /// Checks that the model server answers at all. Used by the health route.
    pub async fn ping(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, TAGS_PATH))
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turns non-2xx responses into `LlmError::Api`, preferring the server's `{"error": ...}` text.
async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<OllamaError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}
