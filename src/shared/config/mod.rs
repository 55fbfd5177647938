//! Application configuration module
//!
//! Provides the connection parameters of a pairing session and the base URLs
//! of the external services it consumes. The three relay parameters (relay
//! URL, bearer credential, room identifier) are all required; `validate`
//! reports the first one missing so callers can surface a blocking status.

use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// WebSocket URL of the relay
    pub relay_url: Option<String>,
    /// Bearer credential appended to the relay URL
    pub auth_token: Option<String>,
    /// Room shared with the partner
    pub room_id: Option<String>,
    /// Base URL of the question and execution service
    pub questions_url: Option<String>,
    /// Base URL of the chat assistant service
    pub chatbot_url: Option<String>,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Names of the relay parameters that are absent or blank
    pub fn missing_connection_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.relay_url) {
            missing.push("relay url");
        }
        if is_blank(&self.auth_token) {
            missing.push("auth token");
        }
        if is_blank(&self.room_id) {
            missing.push("room id");
        }
        missing
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(field) = self.missing_connection_fields().first() {
            return Err(ConfigError::MissingValue(field));
        }
        if let Some(url) = &self.relay_url {
            let parsed = url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        for url in [&self.questions_url, &self.chatbot_url].into_iter().flatten() {
            url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    relay_url: Option<String>,
    auth_token: Option<String>,
    room_id: Option<String>,
    questions_url: Option<String>,
    chatbot_url: Option<String>,
}

impl AppConfigBuilder {
    /// Set the relay URL
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = Some(url.into());
        self
    }

    /// Set the bearer credential
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the room identifier
    pub fn room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    /// Set the question/execution service URL
    pub fn questions_url(mut self, url: impl Into<String>) -> Self {
        self.questions_url = Some(url.into());
        self
    }

    /// Set the assistant service URL
    pub fn chatbot_url(mut self, url: impl Into<String>) -> Self {
        self.chatbot_url = Some(url.into());
        self
    }

    /// Build the configuration without requiring the relay parameters
    ///
    /// Missing relay parameters are not an error here: a session built from
    /// an incomplete configuration reports a blocking status instead.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            relay_url: self.relay_url,
            auth_token: self.auth_token,
            room_id: self.room_id,
            questions_url: self.questions_url,
            chatbot_url: self.chatbot_url,
        };
        for url in [&config.questions_url, &config.chatbot_url].into_iter().flatten() {
            url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}
