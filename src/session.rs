//! In-memory session registry for the HTTP shell

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::conversation::Conversation;

/// Conversation guarded for the duration of a turn
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Independent conversations keyed by session id
///
/// Nothing expires; sessions live until deleted or the process exits.
pub struct SessionStore {
    greeting: String,
    sessions: RwLock<HashMap<Uuid, SharedConversation>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session holding only the greeting
    pub async fn create(&self) -> (Uuid, SharedConversation) {
        let conversation = Conversation::new(self.greeting.clone());
        let id = conversation.id();
        let shared = Arc::new(Mutex::new(conversation));

        self.sessions.write().await.insert(id, Arc::clone(&shared));
        tracing::debug!(session = %id, "session created");

        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedConversation> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// End a session; returns false if it did not exist
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
