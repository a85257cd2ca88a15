// src/services/chatbot.rs
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::Config,
    error::AppError,
    services::{
        generation::{GeminiClient, GenerationService},
        session_manager::{Message, SessionManager},
    },
};

/// Outcome of one successful chat turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub reply: String,
    pub history: Vec<Message>,
}

/// The chat loop: validate input, ask the model, record the exchange.
#[derive(Clone)]
pub struct ChatService {
    generator: Option<Arc<dyn GenerationService>>,
    history_limit: usize,
    max_message_chars: usize,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("configured", &self.generator.is_some())
            .field("history_limit", &self.history_limit)
            .field("max_message_chars", &self.max_message_chars)
            .finish()
    }
}

impl ChatService {
    /// Wire the Gemini client from `config`. Without a credential the
    /// service still builds but every turn fails with a configuration error.
    pub fn from_config(config: &Config) -> Self {
        let generator = match GeminiClient::from_config(config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn GenerationService>),
            Err(e) => {
                warn!(error = %e, "chat disabled");
                None
            }
        };
        Self {
            generator,
            history_limit: config.history_limit,
            max_message_chars: config.max_message_chars,
        }
    }

    pub fn with_generator(config: &Config, generator: Arc<dyn GenerationService>) -> Self {
        Self {
            generator: Some(generator),
            history_limit: config.history_limit,
            max_message_chars: config.max_message_chars,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Run one turn for `session_id`.
    ///
    /// The session is only written to when the model answers, so a failed
    /// call leaves the store exactly as it was. An unknown `session_id` is
    /// opened by its first successful turn; a session removed while the
    /// model is answering stays removed.
    pub async fn handle_turn(
        &self,
        sessions: &SessionManager,
        session_id: &str,
        input: &str,
    ) -> Result<Turn, AppError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::EmptyInput);
        }
        if trimmed.chars().count() > self.max_message_chars {
            return Err(AppError::MessageTooLong { max: self.max_message_chars });
        }

        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| AppError::Configuration(crate::config::missing_key_message()))?;

        let existing = sessions.get_history(session_id).await;
        let prompt = build_prompt(existing.as_deref().unwrap_or_default(), trimmed, self.history_limit);

        let reply = generator.generate(&prompt).await?;

        let history = match existing {
            Some(_) => sessions
                .append_exchange(session_id, trimmed, reply.as_str())
                .await
                .ok_or_else(|| {
                    warn!(session_id, "session ended while waiting for the model, reply dropped");
                    AppError::SessionNotFound(session_id.to_string())
                })?,
            None => sessions.open_with_exchange(session_id, trimmed, reply.as_str()).await,
        };
        info!(session_id, turns = history.len(), "chat turn completed");

        Ok(Turn { reply, history })
    }
}

/// Prior turns plus the new input, blank entries dropped, keeping only the
/// most recent `limit` messages.
pub fn build_prompt(history: &[Message], input: &str, limit: usize) -> Vec<Message> {
    let mut prompt: Vec<Message> = history
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| Message::new(m.role, m.content.trim()))
        .collect();
    prompt.push(Message::user(input));

    let limit = limit.max(1);
    if prompt.len() > limit {
        prompt.drain(..prompt.len() - limit);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_manager::MessageRole;

    #[test]
    fn prompt_ends_with_input() {
        let history = vec![Message::user("a"), Message::assistant("b")];
        let prompt = build_prompt(&history, "c", 20);
        let texts: Vec<_> = prompt.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(prompt[2].role, MessageRole::User);
    }

    #[test]
    fn prompt_is_windowed() {
        let history: Vec<Message> = (0..10)
            .map(|i| if i % 2 == 0 { Message::user(format!("u{i}")) } else { Message::assistant(format!("a{i}")) })
            .collect();
        let prompt = build_prompt(&history, "latest", 3);
        let texts: Vec<_> = prompt.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["u8", "a9", "latest"]);

        let only_latest = build_prompt(&history, "latest", 1);
        assert_eq!(only_latest.len(), 1);
        assert_eq!(only_latest[0].content, "latest");
    }

    #[test]
    fn prompt_skips_blank_entries() {
        let history = vec![Message::user("  "), Message::assistant(" ok ")];
        let prompt = build_prompt(&history, "next", 20);
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].content, "ok");
    }
}
