//! OpenAI-compatible chat-completions client.
//!
//! Sends one user message holding an inline `data:` image and the text
//! instruction, and returns `choices[0].message.content`. Works against
//! any server that implements the `/chat/completions` vision API.

use serde::Deserialize;
use serde_json::json;
use tagtally_core::normalize::jpeg_data_uri;

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::retry::retry_transient;
use crate::AnnotationOracle;

/// HTTP client for an OpenAI-compatible vision endpoint.
pub struct OpenAiOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

/// The subset of a chat-completions response the oracle reads.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiOracle {
    /// Create a client with its own connection pool and request timeout.
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// JSON body for one annotation request.
    pub fn request_body(&self, image_b64: &str, instruction: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "image_url",
                            "image_url": { "url": jpeg_data_uri(image_b64) }
                        },
                        {
                            "type": "text",
                            "text": instruction
                        }
                    ]
                }
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "top_p": self.config.top_p,
            "frequency_penalty": self.config.frequency_penalty,
            "presence_penalty": self.config.presence_penalty,
        })
    }

    /// Execute a single POST and return the reply text.
    async fn send_once(&self, body: &serde_json::Value) -> Result<String, OracleError> {
        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let completion: ChatCompletion = response.json().await?;
        message_content(completion)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`OracleError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, OracleError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl AnnotationOracle for OpenAiOracle {
    async fn annotate(&self, image_b64: &str, instruction: &str) -> Result<String, OracleError> {
        let body = self.request_body(image_b64, instruction);
        retry_transient(&self.config.retry, || self.send_once(&body)).await
    }
}

fn message_content(completion: ChatCompletion) -> Result<String, OracleError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(OracleError::EmptyResponse)
}
