//! Conversation state: messages, per-session history and context serialization

mod orchestrator;

pub use orchestrator::{Orchestrator, TurnOutcome};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Assistant message that opens every session
pub const DEFAULT_GREETING: &str = "Hi! How may I assist you today?";

/// Utterance recorded when speech could not be recognized
pub const DEFAULT_FALLBACK: &str = "Sorry, I couldn't understand that.";

/// Author of a stored message
///
/// System instructions are built per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Lower-case wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh identifier
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Serialize messages as `"<role>: <content>"` lines in sequence order
///
/// No trailing newline. This is the transcript handed to the chat backend.
#[must_use]
pub fn serialize_context(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ordered, append-only message history of one session
///
/// Always starts with the assistant greeting. Only the [`Orchestrator`]
/// appends to it.
#[derive(Debug)]
pub struct Conversation {
    id: Uuid,
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a session whose history holds only the greeting
    #[must_use]
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![Message::new(Role::Assistant, greeting)],
        }
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// All messages in chronological order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; the greeting is never removed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Full transcript serialized for the chat backend
    #[must_use]
    pub fn context(&self) -> String {
        serialize_context(&self.messages)
    }

    pub(crate) fn push(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    /// Drop messages appended after `len`, keeping at least the greeting
    pub(crate) fn rollback(&mut self, len: usize) {
        self.messages.truncate(len.max(1));
    }
}
