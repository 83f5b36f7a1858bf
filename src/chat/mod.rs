//! Chat completion backend
//!
//! Each request carries two messages: a system message with the serialized
//! conversation and a user message with the new utterance.

mod client;

pub use client::ChatClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One message on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Build the request messages for one completion
#[must_use]
pub fn build_messages(utterance: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("Previous conversation:\n{context}")),
        ChatMessage::user(utterance),
    ]
}

/// Generates assistant replies
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Complete `utterance` given the serialized conversation `context`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Chat`] or a transport error if the backend fails
    async fn complete(&self, utterance: &str, context: &str) -> Result<String>;

    /// Check that the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns error if the backend does not answer
    async fn probe(&self) -> Result<()>;

    /// Model name
    fn model(&self) -> &str;
}
