//! One user submission end to end: gate checks, the generation round trip
//! and the session update.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chat::models::{ConversationMessage, GenerationReply};
use crate::chat::orchestrator::GenerationError;
use crate::session::state::{SourceVerdict, SubmitGate};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Another request is in flight; nothing was sent.
    Busy,
    /// Rate-limit cooldown is running; nothing was sent.
    CoolingDown { remaining_secs: u32 },
    /// Held until a credential is stored.
    CredentialRequired,
    Replied {
        message: String,
        source_updated: bool,
        render_generation: u64,
        model_response: ConversationMessage,
    },
    Failed {
        kind: &'static str,
        notice: ConversationMessage,
    },
    /// The session was reset while the request was in flight.
    Discarded,
}

pub async fn submit(state: &AppState, text: &str) -> SubmitOutcome {
    let credential = state.credentials.get();

    let flight = {
        let mut session = state.session();
        let cooldown = state.cooldown.remaining();
        if credential.is_none() && !session.is_loading() && cooldown == 0 {
            info!("No credential stored; deferring submission");
            session.defer(text);
            return SubmitOutcome::CredentialRequired;
        }
        match session.begin_submission(text, cooldown) {
            SubmitGate::Busy => return SubmitOutcome::Busy,
            SubmitGate::CoolingDown(remaining_secs) => {
                return SubmitOutcome::CoolingDown { remaining_secs }
            }
            SubmitGate::Proceed(flight) => flight,
        }
    };

    let result = state
        .orchestrator
        .send(credential.as_deref(), &flight.history, text)
        .await;

    match result {
        Ok(reply) => {
            let verdict = check_reply_source(&reply).await;
            let mut session = state.session();
            match session.complete_success(flight, &reply, verdict) {
                Some(accepted) => SubmitOutcome::Replied {
                    message: accepted.message,
                    source_updated: accepted.source_updated,
                    render_generation: session.render_generation(),
                    model_response: reply.model_response,
                },
                None => SubmitOutcome::Discarded,
            }
        }
        Err(err) => {
            let cooldown_secs = state.config.rate_limit_cooldown_secs;
            if err == GenerationError::RateLimited {
                state.cooldown.start(cooldown_secs);
            }
            let mut session = state.session();
            let deferred = err == GenerationError::MissingCredential;
            match session.complete_failure(flight, &err, cooldown_secs) {
                Some(notice) => SubmitOutcome::Failed {
                    kind: err.kind(),
                    notice,
                },
                None if deferred => SubmitOutcome::CredentialRequired,
                None => SubmitOutcome::Discarded,
            }
        }
    }
}

/// Validates and compiles the extracted source off the async workers.
async fn check_reply_source(reply: &GenerationReply) -> SourceVerdict {
    let Some(source) = reply.extracted_source.clone() else {
        return SourceVerdict::Missing;
    };
    match tokio::task::spawn_blocking(move || SourceVerdict::check(&source)).await {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!("Source check task failed: {err}");
            SourceVerdict::Rejected(err.to_string())
        }
    }
}

/// Replays a submission deferred for lack of a credential.
pub async fn resume_pending(state: &AppState) -> Option<SubmitOutcome> {
    let pending = state.session().take_pending()?;
    debug!("Resuming deferred submission");
    Some(submit(state, &pending).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chat::orchestrator::Orchestrator;
    use crate::chat::retry::RetryPolicy;
    use crate::config::Config;
    use crate::document::templates::DEFAULT_TEMPLATE;
    use crate::llm_client::fake::ScriptedService;
    use crate::llm_client::ServiceError;
    use crate::session::credentials::CredentialStore;

    fn app(service: Arc<ScriptedService>, with_key: bool) -> AppState {
        let credentials = CredentialStore::in_memory();
        if with_key {
            credentials.set("key").unwrap();
        }
        AppState::new(
            Config::default(),
            credentials,
            Orchestrator::new(service, RetryPolicy::default()),
        )
    }

    const REPLY: &str = "Here you go:\n```jsx\nimport React from 'react';\nconst ResumeDocument = () => <Document><Page /></Document>;\n```";

    #[tokio::test]
    async fn test_successful_submission_updates_source() {
        let service = Arc::new(ScriptedService::new().reply(Ok(REPLY.to_string())));
        let state = app(service.clone(), true);

        let outcome = submit(&state, "add my name").await;
        match outcome {
            SubmitOutcome::Replied {
                message,
                source_updated,
                render_generation,
                ..
            } => {
                assert_eq!(message, "Here you go:");
                assert!(source_updated);
                assert_eq!(render_generation, 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let session = state.session();
        assert_ne!(session.active_source(), DEFAULT_TEMPLATE);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_source_without_root_component_is_not_applied() {
        let reply = "Renamed it:\n```jsx\nimport React from 'react';\n\
                     const Resume = () => <Document><Page /></Document>;\n\
                     export default Resume;\n```";
        let service = Arc::new(ScriptedService::new().reply(Ok(reply.to_string())));
        let state = app(service, true);

        match submit(&state, "rename the component").await {
            SubmitOutcome::Replied {
                message,
                source_updated,
                render_generation,
                ..
            } => {
                assert!(!source_updated);
                assert!(message.ends_with("Renamed it:"));
                assert_eq!(render_generation, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let session = state.session();
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_during_request_keeps_gate_closed() {
        let service = Arc::new(ScriptedService::new().reply(Ok(REPLY.to_string())));
        let state = app(service.clone(), true);
        let stale = match state.session().begin_submission("first", 0) {
            SubmitGate::Proceed(flight) => flight,
            other => panic!("expected to proceed, got {other:?}"),
        };
        state.session().reset();

        assert!(matches!(submit(&state, "second").await, SubmitOutcome::Busy));
        assert_eq!(service.calls(), 0);

        let err = GenerationError::NetworkError("timed out".into());
        assert!(state.session().complete_failure(stale, &err, 0).is_none());
        assert!(matches!(
            submit(&state, "second").await,
            SubmitOutcome::Replied { source_updated: true, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_response_starts_cooldown() {
        let service = Arc::new(ScriptedService::new().reply(Err(ServiceError::Api {
            status: 500,
            message: "Internal server error: exceeded quota".to_string(),
        })));
        let state = app(service.clone(), true);

        let outcome = submit(&state, "hi").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                kind: "rate_limited",
                ..
            }
        ));
        assert_eq!(state.cooldown.remaining(), 60);
        let session = state.session();
        assert_eq!(session.transcript().len(), 1);
        assert!(session.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitting_during_cooldown_makes_no_call() {
        let service = Arc::new(ScriptedService::new());
        let state = app(service.clone(), true);
        state.cooldown.start(60);

        let outcome = submit(&state, "hi").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::CoolingDown { remaining_secs: 60 }
        ));
        assert_eq!(service.calls(), 0);
        assert!(state.session().transcript().is_empty());
    }

    #[tokio::test]
    async fn test_submitting_while_loading_makes_no_call() {
        let service = Arc::new(ScriptedService::new());
        let state = app(service.clone(), true);
        let _flight = state.session().begin_submission("first", 0);

        assert!(matches!(submit(&state, "second").await, SubmitOutcome::Busy));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_defers_then_resumes() {
        let service = Arc::new(ScriptedService::new().reply(Ok("Hello!".to_string())));
        let state = app(service.clone(), false);

        assert!(matches!(
            submit(&state, "hi").await,
            SubmitOutcome::CredentialRequired
        ));
        assert_eq!(service.calls(), 0);
        assert_eq!(state.session().pending(), Some("hi"));

        state.credentials.set("key").unwrap();
        let outcome = resume_pending(&state).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied { source_updated: false, .. }));
        assert_eq!(service.calls(), 1);
        assert!(resume_pending(&state).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_credential_is_surfaced() {
        let service = Arc::new(ScriptedService::new().reply(Err(ServiceError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        })));
        let state = app(service, true);
        match submit(&state, "hi").await {
            SubmitOutcome::Failed { kind, notice } => {
                assert_eq!(kind, "invalid_credential");
                assert_eq!(notice.text, "Invalid API key");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!state.session().is_loading());
    }
}
