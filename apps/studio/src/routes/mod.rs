pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::document::handlers as document;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/session", get(session::handle_get_session))
        .route("/api/v1/session/messages", post(chat::handle_submit))
        .route("/api/v1/session/reset", post(session::handle_reset))
        // Credential
        .route(
            "/api/v1/credential",
            get(session::handle_get_credential)
                .put(session::handle_put_credential)
                .delete(session::handle_delete_credential),
        )
        // Preview and export
        .route("/api/v1/preview", get(document::handle_preview))
        .route("/api/v1/preview/pdf", get(document::handle_preview_pdf))
        .route("/api/v1/preview/refresh", post(document::handle_refresh))
        .route("/api/v1/export", get(document::handle_export))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::chat::orchestrator::Orchestrator;
    use crate::chat::retry::RetryPolicy;
    use crate::config::Config;
    use crate::llm_client::fake::ScriptedService;
    use crate::llm_client::ServiceError;
    use crate::session::credentials::CredentialStore;

    fn app_state(service: ScriptedService) -> AppState {
        AppState::new(
            Config::default(),
            CredentialStore::in_memory(),
            Orchestrator::new(Arc::new(service), RetryPolicy::default()),
        )
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = build_router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), headers)
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = app_state(ScriptedService::new());
        let (status, body, _) = call(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn test_preview_of_default_template_is_ready() {
        let state = app_state(ScriptedService::new());
        let (status, body, _) = call(&state, Method::GET, "/api/v1/preview", None).await;
        assert_eq!(status, StatusCode::OK);
        let json = json_of(&body);
        assert_eq!(json["status"], "ready");
        assert_eq!(json["generation"], 1);
    }

    #[tokio::test]
    async fn test_refresh_forces_new_document() {
        let state = app_state(ScriptedService::new());
        let (_, first, _) = call(&state, Method::GET, "/api/v1/preview", None).await;
        let (_, refreshed, _) = call(&state, Method::POST, "/api/v1/preview/refresh", None).await;
        assert_eq!(json_of(&refreshed)["render_generation"], 2);
        let (_, second, _) = call(&state, Method::GET, "/api/v1/preview", None).await;
        assert_ne!(json_of(&first)["document_id"], json_of(&second)["document_id"]);
    }

    #[tokio::test]
    async fn test_export_downloads_attachment() {
        let state = app_state(ScriptedService::new());
        let (status, body, headers) = call(&state, Method::GET, "/api/v1/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert_eq!(disposition, "attachment; filename=\"resume.pdf\"");
        assert_eq!(state.exports.live(), 0);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let state = app_state(ScriptedService::new());
        let (status, body, _) = call(
            &state,
            Method::POST,
            "/api/v1/session/messages",
            Some(json!({ "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_submit_without_credential_is_deferred() {
        let state = app_state(ScriptedService::new());
        let (status, body, _) = call(
            &state,
            Method::POST,
            "/api/v1/session/messages",
            Some(json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "credential_required");

        let (_, snapshot, _) = call(&state, Method::GET, "/api/v1/session", None).await;
        let snapshot = json_of(&snapshot);
        assert_eq!(snapshot["pending_submission"], "hello");
        assert_eq!(snapshot["credential_present"], false);
    }

    #[tokio::test]
    async fn test_rejected_credential_is_not_stored() {
        let service = ScriptedService::new().validation(Err(ServiceError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        }));
        let state = app_state(service);
        let (status, body, _) = call(
            &state,
            Method::PUT,
            "/api/v1/credential",
            Some(json!({ "api_key": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(&body)["error"]["message"], "Invalid API key");
        assert!(!state.credentials.is_present());
    }

    #[tokio::test]
    async fn test_credential_roundtrip() {
        let state = app_state(ScriptedService::new());
        let (status, body, _) = call(
            &state,
            Method::PUT,
            "/api/v1/credential",
            Some(json!({ "api_key": "good" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["present"], true);

        let (status, _, _) = call(&state, Method::DELETE, "/api/v1/credential", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body, _) = call(&state, Method::GET, "/api/v1/credential", None).await;
        assert_eq!(json_of(&body)["present"], false);
    }

    #[tokio::test]
    async fn test_reset_restores_default_source() {
        let state = app_state(ScriptedService::new());
        state.session().accept_source("import React from 'react';");
        let (status, body, _) = call(&state, Method::POST, "/api/v1/session/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["render_generation"], 3);
        assert_eq!(
            state.session().active_source(),
            crate::document::templates::DEFAULT_TEMPLATE
        );
    }

    #[tokio::test]
    async fn test_export_failure_is_noted_in_transcript() {
        let state = app_state(ScriptedService::new());
        state.session().accept_source("const nothing = 1;");
        let (status, body, _) = call(&state, Method::GET, "/api/v1/export", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_of(&body)["error"]["message"],
            "Error downloading PDF. Please try again."
        );
        let (_, snapshot, _) = call(&state, Method::GET, "/api/v1/session", None).await;
        assert_eq!(
            json_of(&snapshot)["transcript"][0]["text"],
            "Error downloading PDF. Please try again."
        );
    }
}
