// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: Instant,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), timestamp: Instant::now() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub messages: Vec<Message>,
    pub last_active: Instant,
}

impl Session {
    fn with_exchange(user: Message, assistant: Message) -> Self {
        Self { messages: vec![user, assistant], last_active: Instant::now() }
    }
}

/// In-memory store of chat sessions. Nothing survives a restart.
///
/// A session only exists once it holds a completed exchange; failed turns
/// never create one.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Id for a conversation that has not been stored yet.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Store the first exchange of a conversation. If a concurrent turn
    /// already opened the same id, the exchange is appended to it.
    pub async fn open_with_exchange(
        &self,
        session_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Vec<Message> {
        let (user, assistant) = (Message::user(user), Message::assistant(assistant));
        let mut guard = self.inner.write().await;
        match guard.get_mut(session_id) {
            Some(session) => {
                session.messages.push(user);
                session.messages.push(assistant);
                session.last_active = Instant::now();
                session.messages.clone()
            }
            None => {
                let session = Session::with_exchange(user, assistant);
                let history = session.messages.clone();
                guard.insert(session_id.to_string(), session);
                history
            }
        }
    }

    /// Append a user turn and the assistant reply under one lock, so readers
    /// never observe a half-finished exchange. Returns the new history, or
    /// `None` when the session ended in the meantime.
    pub async fn append_exchange(
        &self,
        session_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Option<Vec<Message>> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(session_id)?;
        session.messages.push(Message::user(user));
        session.messages.push(Message::assistant(assistant));
        session.last_active = Instant::now();
        Some(session.messages.clone())
    }

    /// Get a copy of the session history
    pub async fn get_history(&self, session_id: &str) -> Option<Vec<Message>> {
        let guard = self.inner.read().await;
        guard.get(session_id).map(|s| s.messages.clone())
    }

    /// Remove a session by id
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than ttl. Returns number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, s| now.duration_since(s.last_active) < self.ttl);
        before - guard.len()
    }

    pub async fn active_sessions(&self) -> usize {
        self.inner.read().await.len()
    }
}
