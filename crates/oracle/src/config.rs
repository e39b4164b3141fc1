use std::time::Duration;

use tagtally_core::config::{env_parse, env_required, ConfigError};

use crate::retry::RetryConfig;

/// Default endpoint for OpenAI-compatible chat completions.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Connection and sampling settings for [`OpenAiOracle`](crate::OpenAiOracle).
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl OracleConfig {
    /// Configuration with default sampling parameters for the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 256,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            request_timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                     |
    /// |-----------------------|-----------------------------|
    /// | `OPENAI_API_KEY`      | required                    |
    /// | `OPENAI_BASE_URL`     | `https://api.openai.com/v1` |
    /// | `OPENAI_MODEL`        | `gpt-4o`                    |
    /// | `OPENAI_TEMPERATURE`  | `1.0`                       |
    /// | `OPENAI_MAX_TOKENS`   | `256`                       |
    /// | `OPENAI_TIMEOUT_SECS` | `120`                       |
    /// | `ORACLE_MAX_ATTEMPTS` | `4`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(env_required("OPENAI_API_KEY")?);

        let timeout_secs: u64 =
            env_parse("OPENAI_TIMEOUT_SECS", defaults.request_timeout.as_secs())?;
        let retry = RetryConfig {
            max_attempts: env_parse("ORACLE_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            ..defaults.retry.clone()
        };

        Ok(Self {
            base_url: env_parse("OPENAI_BASE_URL", defaults.base_url.clone())?,
            model: env_parse("OPENAI_MODEL", defaults.model.clone())?,
            temperature: env_parse("OPENAI_TEMPERATURE", defaults.temperature)?,
            max_tokens: env_parse("OPENAI_MAX_TOKENS", defaults.max_tokens)?,
            request_timeout: Duration::from_secs(timeout_secs),
            retry,
            ..defaults
        })
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sampling_parameters() {
        let config = OracleConfig::new("sk-test");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.frequency_penalty, 0.0);
        assert_eq!(config.presence_penalty, 0.0);
    }

    #[test]
    fn completions_url_handles_trailing_slash() {
        let mut config = OracleConfig::new("k");
        assert_eq!(
            config.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        config.base_url = "http://localhost:11434/v1/".into();
        assert_eq!(
            config.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
