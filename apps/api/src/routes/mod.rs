pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::rag::handlers;
use crate::screening::handlers as screening_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Document chat API
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/documents",
            post(handlers::handle_load_document),
        )
        .route("/api/v1/sessions/:id/ask", post(handlers::handle_ask))
        .route(
            "/api/v1/sessions/:id/messages",
            get(handlers::handle_get_messages),
        )
        .route(
            "/api/v1/sessions/:id/clear-chat",
            post(handlers::handle_clear_chat),
        )
        .route(
            "/api/v1/sessions/:id/reset",
            post(handlers::handle_reset_session),
        )
        // Screening API
        .route(
            "/api/v1/screening",
            post(screening_handlers::handle_screening),
        )
        .with_state(state)
}
