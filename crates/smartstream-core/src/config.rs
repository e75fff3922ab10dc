use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SmartstreamError;
use crate::types::{Backend, TruncationDirection};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".smartstream.toml";

/// Top-level configuration loaded from `.smartstream.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// The struct is populated once at startup and handed to each component;
/// nothing below the entry point reads the process environment.
///
/// # Examples
///
/// ```
/// use smartstream_core::SmartstreamConfig;
///
/// let config = SmartstreamConfig::default();
/// assert_eq!(config.input.max_chars, 4000);
/// assert_eq!(config.slack.channel, "#devops-alerts");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartstreamConfig {
    /// Which suggestion service to call.
    #[serde(default)]
    pub backend: Backend,
    /// Chat-completions backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Hosted inference endpoint settings.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Log loading and truncation policy.
    #[serde(default)]
    pub input: InputConfig,
    /// Persisted suggestion files.
    #[serde(default)]
    pub output: OutputConfig,
    /// Slack notification settings.
    #[serde(default)]
    pub slack: SlackConfig,
}

impl SmartstreamConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Io`] if the file cannot be read, or
    /// [`SmartstreamError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, SmartstreamError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartstream_core::{Backend, SmartstreamConfig};
    ///
    /// let toml = r#"
    /// backend = "endpoint"
    ///
    /// [input]
    /// max_chars = 2000
    /// "#;
    /// let config = SmartstreamConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.backend, Backend::Endpoint);
    /// assert_eq!(config.input.max_chars, 2000);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SmartstreamError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `.smartstream.toml` from `dir` when it
    /// exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Propagates [`SmartstreamConfig::from_file`] errors.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, SmartstreamError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = dir.join(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Overlay values from environment variables.
    ///
    /// `lookup` is normally `|k| std::env::var(k).ok()`; tests pass a map.
    /// Empty values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartstream_core::SmartstreamConfig;
    ///
    /// let mut config = SmartstreamConfig::default();
    /// config.apply_env(|key| match key {
    ///     "SLACK_CHANNEL" => Some("#builds".into()),
    ///     "SLACK_BOT_TOKEN" => Some(String::new()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.slack.channel, "#builds");
    /// assert!(config.slack.token.is_none());
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.llm.model = v;
        }

        if let Some(v) = get("SAGEMAKER_ENDPOINT") {
            self.endpoint.name = Some(v);
        }
        if let Some(v) = get("SAGEMAKER_ENDPOINT_URL") {
            self.endpoint.url = Some(v);
        }
        if let Some(v) = get("AWS_REGION") {
            self.endpoint.region = v;
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            self.endpoint.access_key_id = Some(v);
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            self.endpoint.secret_access_key = Some(v);
        }
        if let Some(v) = get("AWS_SESSION_TOKEN") {
            self.endpoint.session_token = Some(v);
        }

        if let Some(v) = get("SLACK_BOT_TOKEN") {
            self.slack.token = Some(v);
        }
        if let Some(v) = get("SLACK_CHANNEL") {
            self.slack.channel = v;
        }
        if let Some(v) = get("SLACK_API_BASE") {
            self.slack.api_base = v;
        }
    }

    /// Check that everything the selected backend needs is present.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] naming the missing variable.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartstream_core::SmartstreamConfig;
    ///
    /// let err = SmartstreamConfig::default().validate().unwrap_err();
    /// assert!(err.to_string().contains("OPENAI_API_KEY"));
    /// ```
    pub fn validate(&self) -> Result<(), SmartstreamError> {
        if self.input.max_chars == 0 {
            return Err(SmartstreamError::Config(
                "input.max_chars must be greater than zero".into(),
            ));
        }

        match self.backend {
            Backend::Chat => {
                if self.llm.api_key.is_none() {
                    return Err(SmartstreamError::Config(
                        "Missing OPENAI_API_KEY: the chat backend needs an API key".into(),
                    ));
                }
            }
            Backend::Endpoint => {
                if let Some(name) = &self.endpoint.name {
                    if !is_valid_endpoint_name(name) {
                        return Err(SmartstreamError::Config(format!(
                            "invalid SAGEMAKER_ENDPOINT '{name}': only letters, digits and '-' are allowed"
                        )));
                    }
                }
                // Credentials come from the AWS default chain at call time.
                if self.endpoint.url.is_none() && self.endpoint.name.is_none() {
                    return Err(SmartstreamError::Config(
                        "Missing SAGEMAKER_ENDPOINT: the endpoint backend needs an endpoint name"
                            .into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

fn is_valid_endpoint_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Chat-completions provider configuration.
///
/// # Examples
///
/// ```
/// use smartstream_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4");
/// assert_eq!(config.max_tokens, 400);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Base URL; `/v1/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Maximum output tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4".into()
}

fn default_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_temperature() -> f64 {
    0.4
}

fn default_llm_timeout() -> u64 {
    60
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Hosted inference endpoint configuration.
///
/// # Examples
///
/// ```
/// use smartstream_core::EndpointConfig;
///
/// let config = EndpointConfig {
///     name: Some("log-analyzer-endpoint".into()),
///     ..EndpointConfig::default()
/// };
/// assert_eq!(
///     config.invocation_url().unwrap(),
///     "https://runtime.sagemaker.us-east-1.amazonaws.com/endpoints/log-analyzer-endpoint/invocations"
/// );
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// SageMaker endpoint name.
    pub name: Option<String>,
    /// AWS region hosting the endpoint.
    #[serde(default = "default_region")]
    pub region: String,
    /// Full invocation URL, overriding the SageMaker runtime URL.
    pub url: Option<String>,
    /// AWS access key id used for request signing.
    pub access_key_id: Option<String>,
    /// AWS secret access key used for request signing.
    pub secret_access_key: Option<String>,
    /// Optional STS session token.
    pub session_token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_endpoint_timeout")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".into()
}

fn default_endpoint_timeout() -> u64 {
    60
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("url", &self.url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: None,
            region: default_region(),
            url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            timeout_secs: default_endpoint_timeout(),
        }
    }
}

impl EndpointConfig {
    /// The URL requests are POSTed to.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] when neither `url` nor `name` is set.
    pub fn invocation_url(&self) -> Result<String, SmartstreamError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let name = self.name.as_deref().ok_or_else(|| {
            SmartstreamError::Config("Missing SAGEMAKER_ENDPOINT: no endpoint name".into())
        })?;
        Ok(format!(
            "https://runtime.sagemaker.{}.amazonaws.com/endpoints/{name}/invocations",
            self.region
        ))
    }
}

/// Log loading configuration.
///
/// # Examples
///
/// ```
/// use smartstream_core::{InputConfig, TruncationDirection};
///
/// let config = InputConfig::default();
/// assert_eq!(config.max_chars, 4000);
/// assert_eq!(config.direction, TruncationDirection::Tail);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Maximum characters of log embedded in the prompt.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Which end of an oversized log to keep.
    #[serde(default)]
    pub direction: TruncationDirection,
}

fn default_max_chars() -> usize {
    4000
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            direction: TruncationDirection::default(),
        }
    }
}

/// Persisted output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write the suggestion files at all.
    #[serde(default = "default_true")]
    pub write_files: bool,
    /// File holding the full suggestion.
    #[serde(default = "default_full_file")]
    pub full_file: String,
    /// File holding only the actionable lines.
    #[serde(default = "default_filtered_file")]
    pub filtered_file: String,
    /// Remove emoji and pictographs from the persisted files.
    #[serde(default = "default_true")]
    pub strip_emoji: bool,
}

fn default_true() -> bool {
    true
}

fn default_full_file() -> String {
    "ai_suggestion.txt".into()
}

fn default_filtered_file() -> String {
    "ai_suggestion_filtered.txt".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_files: true,
            full_file: default_full_file(),
            filtered_file: default_filtered_file(),
            strip_emoji: true,
        }
    }
}

/// Slack notification configuration.
///
/// # Examples
///
/// ```
/// use smartstream_core::SlackConfig;
///
/// let config = SlackConfig::default();
/// assert!(config.token.is_none());
/// assert_eq!(config.excerpt_chars, 500);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token; notifications are skipped when absent.
    pub token: Option<String>,
    /// Destination channel.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Slack Web API base URL.
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
    /// Upper bound on the log excerpt attached to an alert.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Send Block Kit blocks in addition to plain text.
    #[serde(default = "default_true")]
    pub rich: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_slack_timeout")]
    pub timeout_secs: u64,
}

fn default_channel() -> String {
    "#devops-alerts".into()
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".into()
}

fn default_excerpt_chars() -> usize {
    500
}

fn default_slack_timeout() -> u64 {
    30
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &redacted(&self.token))
            .field("channel", &self.channel)
            .field("api_base", &self.api_base)
            .field("excerpt_chars", &self.excerpt_chars)
            .field("rich", &self.rich)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: None,
            channel: default_channel(),
            api_base: default_slack_api_base(),
            excerpt_chars: default_excerpt_chars(),
            rich: true,
            timeout_secs: default_slack_timeout(),
        }
    }
}
