use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm_client::WireMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name on the generation endpoint, which calls the assistant `model`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage::new(self.role.wire_name(), self.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub history: Vec<ConversationMessage>,
    pub latest_message: String,
}

/// Parsed reply from the generation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReply {
    pub raw_text: String,
    /// Contents of the first fenced `react`/`javascript`/`jsx` region.
    pub extracted_source: Option<String>,
    pub preceding_message: String,
    /// The full raw reply as an assistant turn.
    pub model_response: ConversationMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_is_model_on_the_wire() {
        let wire = ConversationMessage::assistant("done").to_wire();
        assert_eq!(wire.role, "model");
        assert_eq!(wire.parts[0].text, "done");
        assert_eq!(ConversationMessage::user("x").to_wire().role, "user");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ConversationMessage::assistant("a")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["sent_at"].is_string());
    }
}
