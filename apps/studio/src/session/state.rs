//! Per-process session: conversation, active document source and the
//! transient flags the front end shows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::models::{ConversationMessage, GenerationReply};
use crate::chat::orchestrator::GenerationError;
use crate::document::compiler::compile;
use crate::document::templates::DEFAULT_TEMPLATE;
use crate::document::validator::{self, INVALID_SOURCE_APOLOGY};

pub const GENERIC_FAILURE: &str = "Failed to update resume. Please try again.";
pub const EXPORT_FAILURE: &str = "Error downloading PDF. Please try again.";

pub fn rate_limit_notice(secs: u32) -> String {
    format!("Rate limit reached. Please wait {secs} seconds before trying again.")
}

/// Outcome of trying to start a submission.
#[derive(Debug)]
pub enum SubmitGate {
    /// A request is already in flight.
    Busy,
    CoolingDown(u32),
    Proceed(InFlight),
}

/// Everything needed to finish a submission once the reply is in.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub session_id: Uuid,
    pub user_turn: ConversationMessage,
    /// Orchestration history as it was before this turn.
    pub history: Vec<ConversationMessage>,
}

/// Whether a reply's document source may replace the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceVerdict {
    /// The reply carried no source.
    Missing,
    Valid(String),
    Rejected(String),
}

impl SourceVerdict {
    /// Static validation, then a full compile. CPU bound: async callers run
    /// it on the blocking pool.
    pub fn check(source: &str) -> Self {
        let verdict = validator::validate(source);
        if !verdict.ok {
            return SourceVerdict::Rejected(
                verdict.reason.unwrap_or_else(|| "validation failed".to_string()),
            );
        }
        match compile(source) {
            Ok(_) => SourceVerdict::Valid(source.to_string()),
            Err(err) => SourceVerdict::Rejected(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accepted {
    /// What the user sees for this reply.
    pub message: String,
    pub source_updated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub transcript: Vec<ConversationMessage>,
    pub history_len: usize,
    pub loading: bool,
    pub cooldown_secs: u32,
    pub render_generation: u64,
    pub credential_present: bool,
    pub pending_submission: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    history: Vec<ConversationMessage>,
    transcript: Vec<ConversationMessage>,
    active_source: String,
    render_generation: u64,
    loading: bool,
    pending: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            history: Vec::new(),
            transcript: Vec::new(),
            active_source: DEFAULT_TEMPLATE.to_string(),
            render_generation: 1,
            loading: false,
            pending: None,
        }
    }

    /// Clears everything and restores the default template. The render
    /// generation keeps counting so the preview is forced to refresh.
    /// A request already in flight keeps the loading flag until it completes.
    pub fn reset(&mut self) {
        let next_generation = self.render_generation + 1;
        let loading = self.loading;
        *self = Self::new();
        self.render_generation = next_generation;
        self.loading = loading;
        info!(session_id = %self.id, "Session reset");
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn transcript(&self) -> &[ConversationMessage] {
        &self.transcript
    }

    pub fn active_source(&self) -> &str {
        &self.active_source
    }

    pub fn render_generation(&self) -> u64 {
        self.render_generation
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Holds `text` until a credential is available.
    pub fn defer(&mut self, text: &str) {
        self.pending = Some(text.to_string());
    }

    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Gate checks, then the optimistic transcript update.
    pub fn begin_submission(&mut self, text: &str, cooldown_secs: u32) -> SubmitGate {
        if self.loading {
            return SubmitGate::Busy;
        }
        if cooldown_secs > 0 {
            return SubmitGate::CoolingDown(cooldown_secs);
        }
        let user_turn = ConversationMessage::user(text);
        self.transcript.push(user_turn.clone());
        self.loading = true;
        SubmitGate::Proceed(InFlight {
            session_id: self.id,
            user_turn,
            history: self.history.clone(),
        })
    }

    /// Records a reply whose source was checked as `verdict`. Returns `None`
    /// when the session was reset while the request was in flight.
    pub fn complete_success(
        &mut self,
        flight: InFlight,
        reply: &GenerationReply,
        verdict: SourceVerdict,
    ) -> Option<Accepted> {
        self.loading = false;
        if flight.session_id != self.id {
            debug!("Discarding reply for a reset session");
            return None;
        }
        self.history.push(flight.user_turn);
        self.history.push(reply.model_response.clone());
        self.transcript.push(reply.model_response.clone());

        match verdict {
            SourceVerdict::Missing => Some(Accepted {
                message: reply.preceding_message.clone(),
                source_updated: false,
            }),
            SourceVerdict::Valid(source) => {
                self.accept_source(&source);
                Some(Accepted {
                    message: reply.preceding_message.clone(),
                    source_updated: true,
                })
            }
            SourceVerdict::Rejected(reason) => {
                warn!(%reason, "Rejected generated document source");
                Some(Accepted {
                    message: format!("{INVALID_SOURCE_APOLOGY}{}", reply.preceding_message),
                    source_updated: false,
                })
            }
        }
    }

    /// Rolls back the optimistic user turn and appends the transcript-only
    /// notice for `err`, if any.
    pub fn complete_failure(
        &mut self,
        flight: InFlight,
        err: &GenerationError,
        cooldown_secs: u32,
    ) -> Option<ConversationMessage> {
        self.loading = false;
        if flight.session_id != self.id {
            debug!("Discarding failure for a reset session");
            return None;
        }
        if let Some(pos) = self.transcript.iter().rposition(|m| *m == flight.user_turn) {
            self.transcript.remove(pos);
        }

        let notice = match err {
            GenerationError::MissingCredential => {
                self.defer(&flight.user_turn.text);
                return None;
            }
            GenerationError::RateLimited => rate_limit_notice(cooldown_secs),
            GenerationError::InvalidCredential(message) => message.clone(),
            GenerationError::ServerError { .. } | GenerationError::NetworkError(_) => {
                GENERIC_FAILURE.to_string()
            }
        };
        let notice = ConversationMessage::assistant(notice);
        self.transcript.push(notice.clone());
        Some(notice)
    }

    pub fn accept_source(&mut self, source: &str) {
        self.active_source = source.to_string();
        self.render_generation += 1;
        info!(generation = self.render_generation, "Active document source replaced");
    }

    /// Forces the preview to rebuild from the unchanged source.
    pub fn refresh(&mut self) -> u64 {
        self.render_generation += 1;
        self.render_generation
    }

    pub fn note_export_failure(&mut self) {
        self.transcript
            .push(ConversationMessage::assistant(EXPORT_FAILURE));
    }

    pub fn snapshot(&self, cooldown_secs: u32, credential_present: bool) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            started_at: self.started_at,
            transcript: self.transcript.clone(),
            history_len: self.history.len(),
            loading: self.loading,
            cooldown_secs,
            render_generation: self.render_generation,
            credential_present,
            pending_submission: self.pending.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::Role;

    const VALID: &str = "import React from 'react';\nconst ResumeDocument = () => <Document><Page /></Document>;";

    fn reply(raw: &str, preceding: &str, source: Option<&str>) -> GenerationReply {
        GenerationReply {
            raw_text: raw.to_string(),
            extracted_source: source.map(str::to_string),
            preceding_message: preceding.to_string(),
            model_response: ConversationMessage::assistant(raw),
        }
    }

    fn proceed(session: &mut Session, text: &str) -> InFlight {
        match session.begin_submission(text, 0) {
            SubmitGate::Proceed(flight) => flight,
            other => panic!("expected to proceed, got {other:?}"),
        }
    }

    #[test]
    fn test_new_session_uses_default_template() {
        let session = Session::new();
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
        assert_eq!(session.render_generation(), 1);
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_gate_blocks_while_loading_or_cooling_down() {
        let mut session = Session::new();
        assert!(matches!(session.begin_submission("a", 12), SubmitGate::CoolingDown(12)));
        assert!(session.transcript().is_empty());
        let _flight = proceed(&mut session, "a");
        assert!(matches!(session.begin_submission("b", 0), SubmitGate::Busy));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_success_with_valid_source_updates_document() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "make it better");
        let accepted = session
            .complete_success(
                flight,
                &reply("raw", "Done.", Some(VALID)),
                SourceVerdict::check(VALID),
            )
            .unwrap();
        assert!(accepted.source_updated);
        assert_eq!(accepted.message, "Done.");
        assert_eq!(session.active_source(), VALID);
        assert_eq!(session.render_generation(), 2);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.transcript().len(), 2);
        assert!(!session.is_loading());
    }

    #[test]
    fn test_invalid_source_keeps_document_and_apologizes() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "go");
        let broken = "import React from 'react';\n<Document>";
        let verdict = SourceVerdict::check(broken);
        assert!(matches!(&verdict, SourceVerdict::Rejected(reason) if reason.contains("</Document>")));
        let accepted = session
            .complete_success(flight, &reply("raw", "Updated.", Some(broken)), verdict)
            .unwrap();
        assert!(!accepted.source_updated);
        assert_eq!(accepted.message, format!("{INVALID_SOURCE_APOLOGY}Updated."));
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
        assert_eq!(session.render_generation(), 1);
        // The reply is still part of the conversation.
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_rate_limit_notice_is_transcript_only() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "hi");
        let notice = session
            .complete_failure(flight, &GenerationError::RateLimited, 60)
            .unwrap();
        assert_eq!(
            notice.text,
            "Rate limit reached. Please wait 60 seconds before trying again."
        );
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, Role::Assistant);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_missing_credential_defers_without_notice() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "hello");
        assert!(session
            .complete_failure(flight, &GenerationError::MissingCredential, 0)
            .is_none());
        assert_eq!(session.pending(), Some("hello"));
        assert!(session.transcript().is_empty());
        assert_eq!(session.take_pending().as_deref(), Some("hello"));
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_generic_failure_message() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "hi");
        let err = GenerationError::NetworkError("refused".into());
        let notice = session.complete_failure(flight, &err, 0).unwrap();
        assert_eq!(notice.text, GENERIC_FAILURE);
    }

    #[test]
    fn test_source_that_fails_to_compile_is_rejected() {
        let source = "import React from 'react';\n\
                      const Resume = () => <Document></Document>;\n\
                      export default Resume;";
        assert!(validator::validate(source).ok);
        let verdict = SourceVerdict::check(source);
        assert!(matches!(&verdict, SourceVerdict::Rejected(reason) if reason.contains("ResumeDocument")));

        let mut session = Session::new();
        let flight = proceed(&mut session, "rename it");
        let accepted = session
            .complete_success(flight, &reply("raw", "Renamed.", Some(source)), verdict)
            .unwrap();
        assert!(!accepted.source_updated);
        assert_eq!(accepted.message, format!("{INVALID_SOURCE_APOLOGY}Renamed."));
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
        assert_eq!(session.render_generation(), 1);
    }

    #[test]
    fn test_reply_after_reset_is_discarded() {
        let mut session = Session::new();
        let flight = proceed(&mut session, "hi");
        session.reset();
        assert!(session
            .complete_success(
                flight,
                &reply("raw", "x", Some(VALID)),
                SourceVerdict::Valid(VALID.to_string()),
            )
            .is_none());
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_reset_keeps_gate_closed_until_flight_completes() {
        let mut session = Session::new();
        let stale = proceed(&mut session, "first");
        session.reset();
        assert!(session.is_loading());
        assert!(matches!(session.begin_submission("second", 0), SubmitGate::Busy));
        assert!(session.transcript().is_empty());

        let err = GenerationError::NetworkError("timed out".into());
        assert!(session.complete_failure(stale, &err, 0).is_none());
        assert!(!session.is_loading());
        assert!(session.transcript().is_empty());
        let _next = proceed(&mut session, "second");
    }

    #[test]
    fn test_reset_while_idle_leaves_gate_open() {
        let mut session = Session::new();
        session.reset();
        assert!(!session.is_loading());
        let _flight = proceed(&mut session, "hi");
    }

    #[test]
    fn test_reset_bumps_generation_and_clears() {
        let mut session = Session::new();
        session.accept_source(VALID);
        session.note_export_failure();
        session.reset();
        assert_eq!(session.render_generation(), 3);
        assert!(session.transcript().is_empty());
        assert_eq!(session.active_source(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_export_failure_is_transcript_only() {
        let mut session = Session::new();
        session.note_export_failure();
        assert_eq!(session.transcript()[0].text, EXPORT_FAILURE);
        assert!(session.history().is_empty());
    }
}
