/**
 * Session Configuration
 *
 * Loads the parameters of one pairing session from the environment:
 *
 * | Variable | Meaning |
 * |---|---|
 * | `RELAY_URL` | WebSocket URL of the relay (`ws://` or `wss://`) |
 * | `RELAY_TOKEN` | Bearer credential appended as `?token=` |
 * | `ROOM_ID` | Room shared with the partner |
 * | `QUESTIONS_URL` | Question and execution service (optional) |
 * | `CHATBOT_URL` | Coding assistant service (optional) |
 * | `SESSION_LANGUAGE` | Initial editor language, default `python` |
 * | `QUESTION_ID` | Problem loaded when the session starts (optional) |
 *
 * Missing relay parameters are not a load error. The session reports them
 * through a blocking status instead of silently staying offline.
 */
use crate::client::chat::DEFAULT_NOTICE_TTL;
use crate::shared::config::{AppConfig, ConfigError};
use crate::shared::language::Language;
use std::time::Duration;

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app: AppConfig,
    pub language: Language,
    pub notice_ttl: Duration,
    pub question_id: Option<String>,
}

impl SessionConfig {
    pub fn new(app: AppConfig) -> Self {
        Self {
            app,
            language: Language::default(),
            notice_ttl: DEFAULT_NOTICE_TTL,
            question_id: None,
        }
    }

    /// Read the session parameters from environment variables
    ///
    /// # Errors
    /// Returns `ConfigError` if a service URL does not parse or the language
    /// is not supported.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder();
        if let Some(url) = env_value("RELAY_URL") {
            builder = builder.relay_url(url);
        }
        if let Some(token) = env_value("RELAY_TOKEN") {
            builder = builder.auth_token(token);
        }
        if let Some(room) = env_value("ROOM_ID") {
            builder = builder.room_id(room);
        }
        if let Some(url) = env_value("QUESTIONS_URL") {
            builder = builder.questions_url(url);
        }
        if let Some(url) = env_value("CHATBOT_URL") {
            builder = builder.chatbot_url(url);
        }

        let language = match env_value("SESSION_LANGUAGE") {
            Some(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
                field: "SESSION_LANGUAGE",
                message: format!("{}", e),
            })?,
            None => Language::default(),
        };

        let mut config = Self::new(builder.build()?).with_language(language);
        config.question_id = env_value("QUESTION_ID");
        Ok(config)
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    /// Relay parameters that are absent
    pub fn missing_connection_fields(&self) -> Vec<&'static str> {
        self.app.missing_connection_fields()
    }

    /// Validate everything, including the relay parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
