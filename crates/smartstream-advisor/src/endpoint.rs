use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use smartstream_core::{EndpointConfig, SmartstreamError};

use crate::sigv4::{self, AwsCredentials};

const SERVICE: &str = "sagemaker";

/// How requests to the endpoint are authenticated.
#[derive(Debug, Clone)]
enum Signing {
    /// Explicit `url` override with no keys configured, e.g. a local server.
    Unsigned,
    /// Keys from configuration or the `AWS_*` variables.
    Static(AwsCredentials),
    /// Resolved per call from the AWS default provider chain: profiles,
    /// web identity, container and instance roles.
    DefaultChain,
}

/// Client for a hosted inference endpoint taking `{"inputs": prompt}`.
///
/// Requests to the SageMaker runtime are SigV4-signed. Static keys win when
/// configured; otherwise credentials come from the AWS default chain, so an
/// agent running under an IAM role needs no keys at all. An explicit `url`
/// with no keys is called unsigned.
///
/// # Examples
///
/// ```
/// use smartstream_core::EndpointConfig;
/// use smartstream_advisor::endpoint::EndpointClient;
///
/// let config = EndpointConfig {
///     url: Some("http://localhost:8080/invocations".into()),
///     ..EndpointConfig::default()
/// };
/// let client = EndpointClient::new(&config).unwrap();
/// assert!(!client.is_signed());
/// ```
pub struct EndpointClient {
    client: reqwest::Client,
    url: reqwest::Url,
    region: String,
    signing: Signing,
}

impl EndpointClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] if no URL can be derived, the URL
    /// is malformed, or the HTTP client cannot be built.
    pub fn new(config: &EndpointConfig) -> Result<Self, SmartstreamError> {
        let raw_url = config.invocation_url()?;
        let url = reqwest::Url::parse(&raw_url)
            .map_err(|e| SmartstreamError::Config(format!("invalid endpoint URL '{raw_url}': {e}")))?;

        let signing = match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) => Signing::Static(AwsCredentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
                session_token: config.session_token.clone(),
            }),
            _ if config.url.is_none() => Signing::DefaultChain,
            _ => Signing::Unsigned,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SmartstreamError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            region: config.region.clone(),
            signing,
        })
    }

    /// Whether requests carry an AWS SigV4 signature.
    pub fn is_signed(&self) -> bool {
        !matches!(self.signing, Signing::Unsigned)
    }

    /// The endpoint's invocation URL.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn credentials(&self) -> Result<Option<AwsCredentials>, SmartstreamError> {
        match &self.signing {
            Signing::Unsigned => Ok(None),
            Signing::Static(credentials) => Ok(Some(credentials.clone())),
            Signing::DefaultChain => {
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .load()
                    .await;
                let provider = sdk_config.credentials_provider().ok_or_else(|| {
                    SmartstreamError::Transport("no AWS credentials provider available".into())
                })?;
                let resolved = provider.provide_credentials().await.map_err(|e| {
                    SmartstreamError::Transport(format!("could not resolve AWS credentials: {e}"))
                })?;
                Ok(Some(AwsCredentials {
                    access_key_id: resolved.access_key_id().to_string(),
                    secret_access_key: resolved.secret_access_key().to_string(),
                    session_token: resolved.session_token().map(String::from),
                }))
            }
        }
    }

    /// Invoke the endpoint with `prompt` and return the trimmed generated text.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Transport`] when AWS credentials cannot be
    /// resolved, on network failures, non-2xx statuses, or a body that is
    /// not JSON.
    pub async fn invoke(&self, prompt: &str) -> Result<String, SmartstreamError> {
        let body = serde_json::to_vec(&serde_json::json!({ "inputs": prompt }))?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        if let Some(credentials) = self.credentials().await? {
            let auth_headers = sigv4::sign(
                &credentials,
                &self.region,
                SERVICE,
                "POST",
                &self.url,
                &[("content-type", "application/json")],
                &body,
                chrono::Utc::now(),
            )?;
            for (name, value) in auth_headers {
                request = request.header(name, value);
            }
        }

        tracing::debug!(url = %self.url, signed = self.is_signed(), "invoking inference endpoint");
        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SmartstreamError::Transport(format!("endpoint request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SmartstreamError::Transport(format!(
                "endpoint error {status}: {body_text}"
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            SmartstreamError::Transport(format!("failed to decode endpoint response: {e}"))
        })?;

        Ok(extract_generated_text(&value).trim().to_string())
    }
}

/// Pull the generated text out of an endpoint response.
///
/// A list whose first element has `generated_text` yields that field; any
/// other shape is rendered back to JSON text as-is.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::endpoint::extract_generated_text;
///
/// let v = serde_json::json!([{"generated_text": "Check the npm script"}]);
/// assert_eq!(extract_generated_text(&v), "Check the npm script");
///
/// let v = serde_json::json!({"result": "x"});
/// assert_eq!(extract_generated_text(&v), r#"{"result":"x"}"#);
/// ```
pub fn extract_generated_text(value: &serde_json::Value) -> String {
    let generated = value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("generated_text"));

    match generated {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => value.to_string(),
    }
}
