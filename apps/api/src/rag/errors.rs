use thiserror::Error;

use crate::llm_client::LlmError;

/// Failure kinds of the retrieval pipeline.
///
/// None of these leave a session half-updated: every operation validates and calls out
/// to the model server before touching session state.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(#[source] LlmError),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector at position {position} contains NaN or infinite values")]
    NonFiniteVector { position: usize },

    #[error("No document loaded for session '{0}'")]
    NoDocumentLoaded(String),

    #[error("Answer generation failed: {0}")]
    AnswerGenerationFailure(#[source] LlmError),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("{0}")]
    Validation(String),
}

impl RagError {
    /// Stable machine-readable code used in error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::EmbeddingFailure(_) => "EMBEDDING_FAILURE",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::NonFiniteVector { .. } => "NON_FINITE_VECTOR",
            RagError::NoDocumentLoaded(_) => "NO_DOCUMENT_LOADED",
            RagError::AnswerGenerationFailure(_) => "ANSWER_GENERATION_FAILURE",
            RagError::Timeout { .. } => "TIMEOUT",
            RagError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
