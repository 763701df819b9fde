//! Per-conversation session state
//!
//! One `SessionState` per conversation, threaded explicitly through the
//! supervisor and driver. Nothing in here is shared between sessions.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::catalog::PromptKind;
use super::message::{Message, MessageId, Transcript};
use super::phase::{Phase, Route};

/// Unique session identifier (time-ordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol state of a single conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,

    /// Append-only message log
    transcript: Transcript,

    /// Current pipeline phase
    pub phase: Phase,

    /// A catalog prompt is pending a decision
    pub awaiting_confirm: bool,

    /// Hint computed by the last supervisor step (never carried across steps)
    #[serde(skip)]
    pub route: Option<Route>,

    /// Transcript offset where the current request began
    pub query_start: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let id = SessionId::new();
        debug!(%id, "SessionState::new: called");
        Self {
            id,
            transcript: Transcript::new(),
            phase: Phase::Start,
            awaiting_confirm: false,
            route: None,
            query_start: 0,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    /// Messages belonging to the current request
    pub fn request_window(&self) -> &[Message] {
        self.transcript.since(self.query_start)
    }

    pub fn push_human(&mut self, text: impl Into<String>) -> MessageId {
        self.transcript.push_human(text)
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) -> MessageId {
        self.transcript.push_assistant(text)
    }

    pub fn push_prompt(&mut self, kind: PromptKind) -> MessageId {
        self.transcript.push_prompt(kind)
    }

    /// Check the awaiting-confirmation invariant: a pending decision means
    /// the latest assistant message is a catalog prompt that expects one.
    pub fn invariant_holds(&self) -> bool {
        if !self.awaiting_confirm {
            return true;
        }
        self.transcript
            .last_assistant()
            .is_some_and(|msg| msg.awaits_decision())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_idle() {
        let state = SessionState::new();
        assert_eq!(state.phase, Phase::Start);
        assert!(!state.awaiting_confirm);
        assert!(state.route.is_none());
        assert!(state.messages().is_empty());
        assert!(state.invariant_holds());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionState::new().id, SessionState::new().id);
    }

    #[test]
    fn test_request_window_starts_at_query_start() {
        let mut state = SessionState::new();
        state.push_human("old request with enough words here");
        state.push_prompt(PromptKind::Restart);
        state.push_human("new request");
        state.query_start = 2;
        let window = state.request_window();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].text, "new request");
    }

    #[test]
    fn test_invariant_detects_missing_prompt() {
        let mut state = SessionState::new();
        state.push_assistant("a document");
        state.awaiting_confirm = true;
        assert!(!state.invariant_holds());

        state.push_prompt(PromptKind::ConfirmSolution);
        assert!(state.invariant_holds());
    }

    #[test]
    fn test_route_is_not_serialized() {
        let mut state = SessionState::new();
        state.route = Some(Route::End);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("route").is_none());
    }
}
