/// Generation client: the single point of entry for calls to the remote
/// generation service (`/generate` and `/validate-key`).
///
/// Orchestration talks to the [`GenerationService`] trait so the HTTP
/// transport can be swapped for a scripted fake in tests.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const API_KEY_HEADER: &str = "X-API-Key";
const VALIDATE_FALLBACK: &str = "Failed to validate API key";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
}

/// One turn in the shape the generation endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePart {
    pub text: String,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![WirePart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateBody {
    pub history: Vec<WireMessage>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the raw reply text.
    async fn generate(&self, credential: &str, body: &GenerateBody) -> Result<String, ServiceError>;

    /// `Ok(())` when the service accepts the credential.
    async fn validate_key(&self, credential: &str) -> Result<(), ServiceError>;
}

/// reqwest-backed [`GenerationService`].
#[derive(Clone)]
pub struct HttpGenerationClient {
    client: Client,
    base_url: String,
}

impl HttpGenerationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, credential: &str, body: &GenerateBody) -> Result<String, ServiceError> {
        debug!(turns = body.history.len(), "Sending generation request");
        let response = self
            .client
            .post(self.url("/generate"))
            .header(API_KEY_HEADER, credential)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!("Generation service returned {}: {}", status, text);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }
        debug!(bytes = text.len(), "Generation request succeeded");
        Ok(text)
    }

    async fn validate_key(&self, credential: &str) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(self.url("/validate-key"))
            .header(API_KEY_HEADER, credential)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| VALIDATE_FALLBACK.to_string());
        Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Flattens a `{error, message}` body into one line; other bodies pass
/// through trimmed.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
            message: Some(message),
        }) => format!("{error}: {message}"),
        Ok(ErrorBody {
            error: Some(only), ..
        })
        | Ok(ErrorBody {
            message: Some(only), ..
        }) => only,
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued outcomes in order and records every request.
    #[derive(Default)]
    pub struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, ServiceError>>>,
        validations: Mutex<VecDeque<Result<(), ServiceError>>>,
        requests: Mutex<Vec<GenerateBody>>,
    }

    impl ScriptedService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, outcome: Result<String, ServiceError>) -> Self {
            self.replies.lock().unwrap().push_back(outcome);
            self
        }

        pub fn validation(self, outcome: Result<(), ServiceError>) -> Self {
            self.validations.lock().unwrap().push_back(outcome);
            self
        }

        pub fn requests(&self) -> Vec<GenerateBody> {
            self.requests.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn generate(
            &self,
            _credential: &str,
            body: &GenerateBody,
        ) -> Result<String, ServiceError> {
            self.requests.lock().unwrap().push(body.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted reply left"))
        }

        async fn validate_key(&self, _credential: &str) -> Result<(), ServiceError> {
            self.validations.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_joins_fields() {
        let body = r#"{"error": "Internal server error", "message": "429 RESOURCE_EXHAUSTED quota"}"#;
        assert_eq!(
            api_error_message(body),
            "Internal server error: 429 RESOURCE_EXHAUSTED quota"
        );
    }

    #[test]
    fn test_api_error_message_single_field() {
        assert_eq!(
            api_error_message(r#"{"error": "No API key provided"}"#),
            "No API key provided"
        );
    }

    #[test]
    fn test_api_error_message_plain_body() {
        assert_eq!(api_error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_generate_body_wire_shape() {
        let body = GenerateBody {
            history: vec![WireMessage::new("model", "hi")],
            message: "next".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["history"][0]["role"], "model");
        assert_eq!(json["history"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["message"], "next");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            HttpGenerationClient::new("http://127.0.0.1:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/generate"), "http://127.0.0.1:8000/generate");
    }
}
