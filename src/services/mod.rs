pub mod chatbot;
pub mod generation;
pub mod render;
pub mod session_manager;
