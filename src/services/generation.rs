// src/services/generation.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::{Config, MODEL},
    error::{AppError, GenerationError},
    services::session_manager::{Message, MessageRole},
};

/// Something that turns a conversation into the next assistant reply.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// `prompt` is ordered oldest first and ends with the new user turn.
    async fn generate(&self, prompt: &[Message]) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
    system_prompt: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("url", &self.url)
            .finish()
    }
}

impl GeminiClient {
    /// Fails when the configuration carries no credential.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            url: format!(
                "{}/v1beta/models/{MODEL}:generateContent",
                config.base_url.trim_end_matches('/')
            ),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request<'a>(&'a self, prompt: &'a [Message]) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: prompt
                .iter()
                .map(|m| Content {
                    role: match m.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    },
                    parts: vec![Part { text: &m.content }],
                })
                .collect(),
            system_instruction: self
                .system_prompt
                .as_deref()
                .map(|text| SystemInstruction { parts: vec![Part { text }] }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, prompt: &[Message]) -> Result<String, GenerationError> {
        debug!(turns = prompt.len(), "calling generateContent");

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(status = status.as_u16(), %detail, "generateContent rejected the request");
            return Err(GenerationError::Api { status: status.as_u16(), detail });
        }

        let parsed: GenerateResponse = response.json().await?;
        extract_text(parsed).ok_or(GenerationError::EmptyResponse)
    }
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(system_prompt: Option<&str>) -> GeminiClient {
        let config = Config {
            api_key: Some("k".to_string()),
            base_url: "http://localhost:9/".to_string(),
            system_prompt: system_prompt.map(str::to_string),
            ..Config::default()
        };
        GeminiClient::from_config(&config).unwrap()
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = GeminiClient::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn url_targets_the_fixed_model() {
        assert_eq!(
            client(None).url(),
            "http://localhost:9/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_maps_roles_and_config() {
        let c = client(Some("be brief"));
        let prompt = vec![Message::user("hello"), Message::assistant("hi"), Message::user("again")];
        let body = serde_json::to_value(c.build_request(&prompt)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "again");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);
    }

    #[test]
    fn system_instruction_omitted_when_unset() {
        let c = client(None);
        let prompt = vec![Message::user("hello")];
        let body = serde_json::to_value(c.build_request(&prompt)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn text_parts_are_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo "}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed).as_deref(), Some("Hello"));
    }

    #[test]
    fn blocked_candidate_has_no_text() {
        let raw = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(extract_text(parsed).is_none());

        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(parsed).is_none());
    }

    #[test]
    fn error_detail_prefers_api_message() {
        assert_eq!(
            error_detail(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            "API key not valid"
        );
        let long = "x".repeat(500);
        assert_eq!(error_detail(&long).len(), 200);
    }
}
