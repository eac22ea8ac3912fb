use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::rag::RagPipeline;
use crate::screening::JobCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Sessions, chunker and model collaborators. Built once at start-up.
    pub rag: Arc<RagPipeline>,
    /// Job postings used for best-match screening.
    pub jobs: Arc<JobCatalog>,
    /// Raw model-server client, used by the health probe.
    pub llm: LlmClient,
    pub config: Config,
}
