//! Multi-turn exchange with the generation service: request assembly,
//! failure classification, server-error retry and reply parsing.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chat::extract::extract_source;
use crate::chat::models::{ConversationMessage, GenerationReply, GenerationRequest, Role};
use crate::chat::retry::RetryPolicy;
use crate::llm_client::prompts::system_instruction;
use crate::llm_client::{GenerateBody, GenerationService, ServiceError, WireMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API key required")]
    MissingCredential,

    #[error("{0}")]
    InvalidCredential(String),

    #[error("Rate limit reached")]
    RateLimited,

    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(String),
}

impl GenerationError {
    /// Stable identifier used in HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingCredential => "missing_credential",
            GenerationError::InvalidCredential(_) => "invalid_credential",
            GenerationError::RateLimited => "rate_limited",
            GenerationError::ServerError { .. } => "server_error",
            GenerationError::NetworkError(_) => "network_error",
        }
    }
}

/// Maps a transport-level failure onto the generation taxonomy.
pub fn classify(err: ServiceError) -> GenerationError {
    let (status, message) = match err {
        ServiceError::Transport(message) => return GenerationError::NetworkError(message),
        ServiceError::Api { status, message } => (status, message),
    };
    let lower = message.to_lowercase();

    if lower.contains("no api key provided") {
        GenerationError::MissingCredential
    } else if status == 401 || status == 403 || lower.contains("invalid api key") {
        GenerationError::InvalidCredential(message)
    } else if status == 429
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("resource_exhausted")
    {
        GenerationError::RateLimited
    } else {
        GenerationError::ServerError { status, message }
    }
}

pub struct Orchestrator {
    service: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn GenerationService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &Arc<dyn GenerationService> {
        &self.service
    }

    /// Instruction block first, then prior turns, then the new user turn.
    pub fn build_request(request: &GenerationRequest) -> GenerateBody {
        let mut history = Vec::with_capacity(request.history.len() + 2);
        history.push(WireMessage::new(
            Role::User.wire_name(),
            system_instruction(),
        ));
        history.extend(request.history.iter().map(ConversationMessage::to_wire));
        history.push(WireMessage::new(
            Role::User.wire_name(),
            request.latest_message.as_str(),
        ));
        GenerateBody {
            history,
            message: request.latest_message.clone(),
        }
    }

    pub async fn send(
        &self,
        credential: Option<&str>,
        history: &[ConversationMessage],
        user_text: &str,
    ) -> Result<GenerationReply, GenerationError> {
        let credential = credential
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::MissingCredential)?;

        let body = Self::build_request(&GenerationRequest {
            history: history.to_vec(),
            latest_message: user_text.to_string(),
        });

        let mut attempt = 1;
        let raw_text = loop {
            match self.service.generate(credential, &body).await {
                Ok(text) => break text,
                Err(err) => {
                    let err = classify(err);
                    if !self.policy.should_retry(attempt, &err) {
                        warn!(attempt, kind = err.kind(), "Generation failed: {err}");
                        return Err(err);
                    }
                    warn!(
                        "Generation attempt {} failed ({}), retrying after {}s...",
                        attempt,
                        err,
                        self.policy.backoff.as_secs()
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
            }
        };

        let extracted = extract_source(&raw_text);
        info!(
            attempt,
            has_source = extracted.source.is_some(),
            "Generation reply received"
        );
        debug!(bytes = raw_text.len(), "Reply text length");

        Ok(GenerationReply {
            model_response: ConversationMessage::assistant(raw_text.as_str()),
            extracted_source: extracted.source,
            preceding_message: extracted.preceding_message,
            raw_text,
        })
    }
}
