use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use tracing::{debug, info};

use crate::{
    config::{MODEL, missing_key_message},
    error::AppError,
    message::{ChatRequest, ChatResponse, HealthResponse, HistoryResponse, to_views},
    services::{render::render_transcript, session_manager::SessionManager},
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let purged = state.sessions.purge_expired().await;
    if purged > 0 {
        debug!(purged, "expired sessions removed");
    }

    // The store is only touched once the turn succeeds.
    let session_id = match payload.session_id.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => SessionManager::new_session_id(),
    };

    let turn = state
        .chat
        .handle_turn(&state.sessions, &session_id, &payload.message)
        .await?;

    Ok(Json(ChatResponse {
        session_id,
        reply: turn.reply,
        messages: to_views(&turn.history),
    }))
}

pub async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = state
        .sessions
        .get_history(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    Ok(Json(HistoryResponse {
        session_id,
        messages: to_views(&history),
    }))
}

pub async fn transcript_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let history = state
        .sessions
        .get_history(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;
    Ok(Html(render_transcript(&history)))
}

pub async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove_session(&session_id).await {
        info!(%session_id, "session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(session_id))
    }
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let configured = state.chat.is_configured();
    Json(HealthResponse {
        ok: configured,
        model: MODEL.to_string(),
        has_api_key: state.config.api_key.is_some(),
        active_sessions: state.sessions.active_sessions().await,
        error: (!configured).then(missing_key_message),
    })
}
