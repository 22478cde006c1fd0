use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use crate::chat::submit::{submit, SubmitOutcome};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

/// POST /api/v1/session/messages
/// Sends the user's text to the generation service and applies the reply.
/// Returns once the reply (or its failure notice) is recorded. The submission
/// runs on its own task, so a dropped connection still completes it.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation("Message text must not be empty".to_string()));
    }
    info!(chars = text.chars().count(), "Submission received");
    let outcome = tokio::spawn(async move { submit(&state, &text).await }).await?;
    Ok(Json(outcome))
}
