// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::chatbot::ChatService;
use crate::services::generation::GenerationService;
use crate::services::session_manager::SessionManager;

pub type SharedState = Arc<AppState>;

#[derive(Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionManager,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let chat = ChatService::from_config(&config);
        Self::with_chat(config, chat)
    }

    /// State backed by a caller-supplied generator instead of Gemini.
    pub fn with_generator(config: Config, generator: Arc<dyn GenerationService>) -> Self {
        let chat = ChatService::with_generator(&config, generator);
        Self::with_chat(config, chat)
    }

    fn with_chat(config: Config, chat: ChatService) -> Self {
        Self {
            sessions: SessionManager::new(config.session_ttl),
            config: Arc::new(config),
            chat,
        }
    }
}
