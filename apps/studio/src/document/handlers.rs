use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::document::export::{export_document, EXPORT_FILE_NAME};
use crate::document::render::{Preview, PreviewSurface, PREVIEW_ERROR};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub render_generation: u64,
}

/// Brings the preview surface up to the session's render generation.
/// Compile and render run on a blocking thread while the surface lock is held.
async fn current_preview(state: &AppState) -> Result<Option<Preview>, AppError> {
    let (source, generation) = {
        let session = state.session();
        (session.active_source().to_string(), session.render_generation())
    };

    let mut surface = state.preview.lock().await;
    if !surface.is_current(generation) {
        debug!(generation, "Rebuilding preview");
        let renderer = state.renderer.clone();
        rebuild(&mut surface, move |working| {
            renderer.refresh_preview(working, &source, generation)
        })
        .await?;
    }
    Ok(surface.current().cloned())
}

/// Runs `job` on a blocking thread against a copy of `surface`. The copy
/// replaces the surface only when the job finishes.
async fn rebuild<F>(surface: &mut PreviewSurface, job: F) -> Result<(), JoinError>
where
    F: FnOnce(&mut PreviewSurface) + Send + 'static,
{
    let mut working = surface.clone();
    *surface = tokio::task::spawn_blocking(move || {
        job(&mut working);
        working
    })
    .await?;
    Ok(())
}

/// GET /api/v1/preview
/// Page layout of the active document, or the error panel.
pub async fn handle_preview(State(state): State<AppState>) -> Result<Json<Preview>, AppError> {
    current_preview(&state)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("preview surface is empty")))
}

/// GET /api/v1/preview/pdf
/// Inline PDF of the current preview.
pub async fn handle_preview_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    current_preview(&state).await?;
    let pdf = state
        .preview
        .lock()
        .await
        .pdf()
        .ok_or_else(|| AppError::Validation(PREVIEW_ERROR.to_string()))?;
    Ok(pdf_response(pdf, "inline"))
}

/// POST /api/v1/preview/refresh
pub async fn handle_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let render_generation = state.session().refresh();
    Json(RefreshResponse { render_generation })
}

/// GET /api/v1/export
/// Compiles the active source afresh and downloads it as `resume.pdf`.
pub async fn handle_export(State(state): State<AppState>) -> Result<Response, AppError> {
    let source = state.session().active_source().to_string();
    let renderer = state.renderer.clone();
    let slots = state.exports.clone();

    let result =
        tokio::task::spawn_blocking(move || export_document(&source, &renderer, &slots)).await?;

    match result {
        Ok(pdf) => {
            info!(bytes = pdf.len(), "Export delivered");
            Ok(pdf_response(Bytes::from(pdf), "attachment"))
        }
        Err(err) => {
            state.session().note_export_failure();
            Err(AppError::Export(err))
        }
    }
}

fn pdf_response(pdf: Bytes, disposition: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        pdf,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::render::DocumentRenderer;
    use crate::document::templates::DEFAULT_TEMPLATE;

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_preview() {
        let mut surface = PreviewSurface::default();
        DocumentRenderer::new().refresh_preview(&mut surface, DEFAULT_TEMPLATE, 1);
        let before = surface.current().cloned().unwrap();

        let result = rebuild(&mut surface, |_| panic!("renderer crashed")).await;
        assert!(result.unwrap_err().is_panic());
        let after = surface.current().unwrap();
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.document_id, before.document_id);
        assert!(surface.pdf().is_some());
    }

    #[tokio::test]
    async fn test_finished_rebuild_replaces_preview() {
        let mut surface = PreviewSurface::default();
        rebuild(&mut surface, |working| {
            DocumentRenderer::new().refresh_preview(working, DEFAULT_TEMPLATE, 4)
        })
        .await
        .unwrap();
        assert!(surface.is_current(4));
    }
}
