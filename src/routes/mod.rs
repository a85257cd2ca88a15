// src/routes/mod.rs
pub mod chat;

use crate::state::SharedState;
use axum::{
    Router,
    routing::{get, post},
};
use chat::{chat_handler, delete_session_handler, health_handler, history_handler, transcript_handler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router() -> Router<SharedState> {
    let session_routes = Router::new()
        .route("/{id}", axum::routing::delete(delete_session_handler))
        .route("/{id}/messages", get(history_handler))
        .route("/{id}/transcript", get(transcript_handler));

    Router::new()
        .route("/chat", post(chat_handler))
        .nest("/sessions", session_routes)
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
}
