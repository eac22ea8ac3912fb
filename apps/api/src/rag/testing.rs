//! In-process collaborators for tests: no model server required.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::LlmError;
use crate::rag::chunker::Chunker;
use crate::rag::embedder::Embedder;
use crate::rag::generator::Generator;
use crate::rag::pipeline::{RagPipeline, RetrievalSettings};
use crate::rag::session::SessionStore;
use crate::rag::vector_index::{DistanceMetric, Vector};

pub const TEST_DIMENSION: usize = 16;

/// Deterministic bag-of-bytes embedder. Can be switched into a failing mode.
#[derive(Default)]
pub struct HashEmbedder {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_embed(text: &str) -> Vector {
    let mut vector = vec![0.0; TEST_DIMENSION];
    for byte in text.bytes() {
        vector[byte as usize % TEST_DIMENSION] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        "hash-test"
    }

    async fn embed(&self, text: &str) -> Result<Vector, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 503,
                message: "embedding model unavailable".to_string(),
            });
        }
        Ok(hash_embed(text))
    }
}

/// Same vectors as `HashEmbedder`, but every call sleeps once switched to slow mode.
pub struct SlowEmbedder {
    delay: Duration,
    slow: AtomicBool,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slow: AtomicBool::new(false),
        }
    }

    pub fn slow_from_now_on(&self) {
        self.slow.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    fn model(&self) -> &str {
        "slow-embed-test"
    }

    async fn embed(&self, text: &str) -> Result<Vector, LlmError> {
        if self.slow.load(Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(hash_embed(text))
    }
}

/// Fails the way a reqwest timeout surfaces from `LlmClient`.
pub struct ClientTimeoutEmbedder;

#[async_trait]
impl Embedder for ClientTimeoutEmbedder {
    fn model(&self) -> &str {
        "timeout-test"
    }

    async fn embed(&self, _text: &str) -> Result<Vector, LlmError> {
        Err(LlmError::Timeout)
    }
}

/// Returns "answer #N" and remembers every prompt it was given.
#[derive(Default)]
pub struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model(&self) -> &str {
        "recording-test"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("answer #{}", prompts.len()))
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model(&self) -> &str {
        "failing-test"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Api {
            status: 500,
            message: "generation backend crashed".to_string(),
        })
    }
}

/// Sleeps before answering; pair with a paused tokio clock.
pub struct SlowGenerator(pub Duration);

#[async_trait]
impl Generator for SlowGenerator {
    fn model(&self) -> &str {
        "slow-test"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

/// Pipeline with 1000/100 chunking, euclidean distance and default settings.
pub fn pipeline_with(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> RagPipeline {
    RagPipeline::new(
        SessionStore::new(DistanceMetric::Euclidean),
        Chunker::new(1000, 100).unwrap(),
        embedder,
        generator,
        RetrievalSettings::default(),
    )
}
