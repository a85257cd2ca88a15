// src/config.rs
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::AppError;

/// Model used for every generation call.
pub const MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub history_limit: usize,
    pub max_message_chars: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
    pub session_ttl: Duration,
    pub system_prompt: Option<String>,
}

// Keep the key out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("base_url", &self.base_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("history_limit", &self.history_limit)
            .field("max_message_chars", &self.max_message_chars)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("session_ttl", &self.session_ttl)
            .field("system_prompt", &self.system_prompt.as_ref().map(String::len))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            history_limit: 20,
            max_message_chars: 1000,
            temperature: 0.7,
            max_output_tokens: 2000,
            request_timeout: Duration::from_secs(60),
            session_ttl: Duration::from_secs(3600),
            system_prompt: None,
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY"));

        let system_prompt = match var("SYSTEM_PROMPT_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    AppError::Configuration(format!(
                        "cannot read SYSTEM_PROMPT_PATH {}: {e}",
                        path.display()
                    ))
                })?;
                Some(text.trim().to_string()).filter(|t| !t.is_empty())
            }
            None => None,
        };

        Ok(Self {
            api_key,
            base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(&var, "PORT", defaults.port)?,
            history_limit: parse_or(&var, "CHAT_HISTORY_LIMIT", defaults.history_limit)?.max(1),
            max_message_chars: parse_or(&var, "CHAT_MAX_MESSAGE_CHARS", defaults.max_message_chars)?,
            temperature: parse_or(&var, "CHAT_TEMPERATURE", defaults.temperature)?,
            max_output_tokens: parse_or(&var, "CHAT_MAX_OUTPUT_TOKENS", defaults.max_output_tokens)?,
            request_timeout: Duration::from_secs(parse_or(
                &var,
                "CHAT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            session_ttl: Duration::from_secs(parse_or(
                &var,
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
            system_prompt,
        })
    }

    /// The credential, or the error every chat turn reports when it is absent.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration(missing_key_message()))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Configuration(format!("invalid HOST/PORT: {e}")))
    }
}

pub fn missing_key_message() -> String {
    "The API key is missing: set GOOGLE_API_KEY (or GEMINI_API_KEY)".to_string()
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Configuration(format!("invalid {key}={raw}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.history_limit, 20);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn gemini_key_is_a_fallback() {
        let cfg = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g")])).unwrap();
        assert_eq!(cfg.require_api_key().unwrap(), "g");

        let cfg = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "a"), ("GEMINI_API_KEY", "g")]))
            .unwrap();
        assert_eq!(cfg.require_api_key().unwrap(), "a");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "   ")])).unwrap();
        assert!(matches!(cfg.require_api_key(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn history_limit_is_at_least_one() {
        let cfg = Config::from_lookup(lookup(&[("CHAT_HISTORY_LIMIT", "0")])).unwrap();
        assert_eq!(cfg.history_limit, 1);
    }

    #[test]
    fn debug_hides_the_key() {
        let cfg = Config {
            api_key: Some("super-secret".to_string()),
            ..Config::default()
        };
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
