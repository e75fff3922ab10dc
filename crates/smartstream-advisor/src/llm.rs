use std::time::Duration;

use serde::Serialize;
use smartstream_core::{LlmConfig, SmartstreamError};

/// A message in a chat conversation with the LLM.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatMessage<'a> {
    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint.
///
/// # Examples
///
/// ```
/// use smartstream_core::LlmConfig;
/// use smartstream_advisor::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model(), "gpt-4");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, SmartstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SmartstreamError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send `prompt` as a single user message and return the trimmed reply.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Transport`] on network failures, non-2xx
    /// statuses, or a response without `choices[0].message.content`.
    pub async fn complete(&self, prompt: &str) -> Result<String, SmartstreamError> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    async fn chat(&self, messages: &[ChatMessage<'_>]) -> Result<String, SmartstreamError> {
        let base_url = self.config.base_url.trim_end_matches('/');
        let url = format!("{base_url}/v1/chat/completions");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        tracing::debug!(model = %self.config.model, %url, "sending chat completion request");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| SmartstreamError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SmartstreamError::Transport(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SmartstreamError::Transport(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                SmartstreamError::Transport(format!(
                    "unexpected response structure: {response_body}"
                ))
            })?;

        Ok(content.trim().to_string())
    }
}
