use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chat::submit::resume_pending;
use crate::errors::AppError;
use crate::llm_client::ServiceError;
use crate::session::state::SessionSnapshot;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub present: bool,
    /// True when a deferred submission was picked up after saving.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub resumed_submission: bool,
}

fn snapshot(state: &AppState) -> SessionSnapshot {
    let cooldown = state.cooldown.remaining();
    let present = state.credentials.is_present();
    state.session().snapshot(cooldown, present)
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(snapshot(&state))
}

/// POST /api/v1/session/reset
/// Clears the conversation and restores the default template.
pub async fn handle_reset(State(state): State<AppState>) -> Json<SessionSnapshot> {
    state.session().reset();
    state.cooldown.clear();
    Json(snapshot(&state))
}

/// GET /api/v1/credential
pub async fn handle_get_credential(State(state): State<AppState>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        present: state.credentials.is_present(),
        resumed_submission: false,
    })
}

/// PUT /api/v1/credential
/// Validates the key with the generation service, stores it, and resumes a
/// submission deferred for lack of one.
pub async fn handle_put_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<CredentialStatus>, AppError> {
    let api_key = req.api_key.trim();
    if api_key.is_empty() {
        return Err(AppError::Validation("Please enter an API key".to_string()));
    }

    if let Err(err) = state.orchestrator.service().validate_key(api_key).await {
        warn!("Credential rejected: {err}");
        return Err(match err {
            ServiceError::Transport(_) => {
                AppError::Upstream("Failed to validate API key. Please try again.".to_string())
            }
            ServiceError::Api { message, .. } => AppError::Unauthorized(message),
        });
    }

    state.credentials.set(api_key)?;
    info!("Credential stored");

    let resumed = state.session().pending().is_some();
    if resumed {
        let background = state.clone();
        tokio::spawn(async move {
            if let Some(outcome) = resume_pending(&background).await {
                info!(?outcome, "Deferred submission finished");
            }
        });
    }

    Ok(Json(CredentialStatus {
        present: true,
        resumed_submission: resumed,
    }))
}

/// DELETE /api/v1/credential
pub async fn handle_delete_credential(
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.credentials.remove()?;
    info!("Credential removed");
    Ok(StatusCode::NO_CONTENT)
}
