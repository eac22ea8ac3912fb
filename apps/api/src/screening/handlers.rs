//! Axum route handlers for the Screening API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::screening::gap_analysis::{screen, ScreeningReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScreeningRequest {
    pub cv_text: String,
    pub jd_text: String,
}

/// POST /api/v1/screening
///
/// Gap score between the CV and the job description, plus the best-matching
/// job from the catalog (if any job is similar at all).
pub async fn handle_screening(
    State(state): State<AppState>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<ScreeningReport>, AppError> {
    let report = screen(&state.rag, &state.jobs, &request.cv_text, &request.jd_text).await?;
    Ok(Json(report))
}
