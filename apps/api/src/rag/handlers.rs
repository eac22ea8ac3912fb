//! Axum route handlers for the session / document chat API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::rag::session::TranscriptEntry;
use crate::rag::vector_index::SearchHit;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadDocumentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct LoadDocumentResponse {
    pub session_id: String,
    pub chunk_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SearchHit>,
    pub messages: Vec<TranscriptEntry>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<TranscriptEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Mints a fresh opaque session id. The session itself is created on first load.
pub async fn handle_create_session() -> Json<CreateSessionResponse> {
    Json(CreateSessionResponse {
        session_id: Uuid::new_v4().simple().to_string(),
    })
}

/// POST /api/v1/sessions/:id/documents
pub async fn handle_load_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<LoadDocumentRequest>,
) -> Result<Json<LoadDocumentResponse>, AppError> {
    validate_session_id(&session_id)?;
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let chunk_count = state.rag.load_document(&session_id, &request.text).await?;

    Ok(Json(LoadDocumentResponse {
        session_id,
        chunk_count,
    }))
}

/// POST /api/v1/sessions/:id/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    validate_session_id(&session_id)?;

    let answer = state.rag.ask(&session_id, &request.question).await?;

    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer.sources,
        messages: answer.transcript,
    }))
}

/// GET /api/v1/sessions/:id/messages
pub async fn handle_get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<MessagesResponse> {
    Json(MessagesResponse {
        messages: state.rag.messages(&session_id).await,
    })
}

/// POST /api/v1/sessions/:id/clear-chat
pub async fn handle_clear_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.rag.clear_chat(&session_id).await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.rag.reset_session(&session_id).await;
    StatusCode::NO_CONTENT
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.rag.delete_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {session_id} not found")))
    }
}

const MAX_SESSION_ID_LEN: usize = 128;

fn validate_session_id(session_id: &str) -> Result<(), AppError> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::Validation(format!(
            "session id must be 1-{MAX_SESSION_ID_LEN} characters"
        )));
    }
    Ok(())
}
