//! Transcript messages
//!
//! The transcript is append-only: messages are pushed, never edited,
//! reordered or removed. Each message gets a position-based [`MessageId`]
//! at append time, which the driver uses to avoid surfacing a message twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::PromptKind;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

/// What an assistant message is, tagged at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "prompt", rename_all = "snake_case")]
pub enum MessageKind {
    /// Free text: a human turn or a worker document
    Content,
    /// Verbatim catalog prompt
    Prompt(PromptKind),
}

/// Position of a message in its transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub usize);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub kind: MessageKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Catalog prompt this message was created from, if any
    pub fn prompt_kind(&self) -> Option<PromptKind> {
        match self.kind {
            MessageKind::Prompt(kind) => Some(kind),
            MessageKind::Content => None,
        }
    }

    /// True for assistant messages created from the prompt catalog
    pub fn is_prompt(&self) -> bool {
        self.is_assistant() && self.prompt_kind().is_some()
    }

    /// True for catalog prompts that expect a go/no-go reply
    pub fn awaits_decision(&self) -> bool {
        self.is_assistant() && self.prompt_kind().is_some_and(|kind| kind.awaits_decision())
    }
}

/// Append-only ordered message log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: Role, kind: MessageKind, text: String) -> MessageId {
        let id = MessageId(self.messages.len());
        debug!(%id, ?role, ?kind, text_len = text.len(), "Transcript::push: called");
        self.messages.push(Message {
            id,
            role,
            kind,
            text,
            created_at: Utc::now(),
        });
        id
    }

    /// Append a human turn
    pub fn push_human(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::Human, MessageKind::Content, text.into())
    }

    /// Append a worker document or other free assistant text
    pub fn push_assistant(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::Assistant, MessageKind::Content, text.into())
    }

    /// Append a catalog prompt, rendered verbatim and tagged with its kind
    pub fn push_prompt(&mut self, kind: PromptKind) -> MessageId {
        self.push(Role::Assistant, MessageKind::Prompt(kind), kind.text().to_string())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages from `offset` onward (empty if the offset is past the end)
    pub fn since(&self, offset: usize) -> &[Message] {
        self.messages.get(offset..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent assistant message
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }
}
