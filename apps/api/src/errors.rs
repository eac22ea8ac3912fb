use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::rag::RagError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Rag(e) => {
                let status = match e {
                    RagError::EmbeddingFailure(_) | RagError::AnswerGenerationFailure(_) => {
                        tracing::error!("Model error: {e}");
                        StatusCode::BAD_GATEWAY
                    }
                    RagError::Timeout { .. } => {
                        tracing::warn!("Model timeout: {e}");
                        StatusCode::GATEWAY_TIMEOUT
                    }
                    RagError::DimensionMismatch { .. } | RagError::NonFiniteVector { .. } => {
                        tracing::error!("Index invariant violated: {e}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    RagError::NoDocumentLoaded(_) => StatusCode::CONFLICT,
                    RagError::Validation(_) => StatusCode::BAD_REQUEST,
                };
                (status, e.code(), e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
