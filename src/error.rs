// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures of one call to the generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("model returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("message cannot be empty")]
    EmptyInput,

    #[error("message too long (max {max} characters)")]
    MessageTooLong { max: usize },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl AppError {
    /// Stable machine-readable code sent to the UI.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIG_ERROR",
            AppError::EmptyInput => "EMPTY_INPUT",
            AppError::MessageTooLong { .. } => "MESSAGE_TOO_LONG",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::Generation(GenerationError::Network(_)) => "NETWORK_ERROR",
            AppError::Generation(GenerationError::Api { .. }) => "LLM_ERROR",
            AppError::Generation(GenerationError::EmptyResponse) => "EMPTY_RESPONSE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EmptyInput | AppError::MessageTooLong { .. } => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(GenerationError::Api { status: 429, .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Generation(e) => {
                warn!(error = %e, "generation call failed");
                e.to_string()
            }
            AppError::Configuration(m) => {
                error!(message = %m, "chat unavailable");
                m.clone()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": self.code(), "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let cases = [
            (AppError::Configuration("x".into()), "CONFIG_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::EmptyInput, "EMPTY_INPUT", StatusCode::BAD_REQUEST),
            (AppError::MessageTooLong { max: 3 }, "MESSAGE_TOO_LONG", StatusCode::BAD_REQUEST),
            (AppError::SessionNotFound("s".into()), "SESSION_NOT_FOUND", StatusCode::NOT_FOUND),
            (GenerationError::EmptyResponse.into(), "EMPTY_RESPONSE", StatusCode::BAD_GATEWAY),
            (
                GenerationError::Api { status: 500, detail: "boom".into() }.into(),
                "LLM_ERROR",
                StatusCode::BAD_GATEWAY,
            ),
            (
                GenerationError::Api { status: 429, detail: "quota".into() }.into(),
                "LLM_ERROR",
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
    }
}
