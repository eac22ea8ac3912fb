use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus whether the model server answers.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let model_server = match state.llm.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!("Model server health probe failed: {e}");
            "unreachable".to_string()
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "docchat",
        "model_server": model_server,
        "embedding_model": state.rag.embedder().model(),
        "generation_model": state.rag.generator().model(),
        "distance_metric": state.config.distance_metric.to_string(),
        "sessions": state.rag.sessions().len().await,
    }))
}
