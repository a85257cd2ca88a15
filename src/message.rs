// src/message.rs
use serde::{Deserialize, Serialize};

use crate::services::session_manager::{Message, MessageRole};

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub messages: Vec<MessageView>,
}

/// Wire form of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self { role: m.role, content: m.content.clone() }
    }
}

#[derive(Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<MessageView>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
    pub has_api_key: bool,
    pub active_sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn to_views(messages: &[Message]) -> Vec<MessageView> {
    messages.iter().map(MessageView::from).collect()
}
