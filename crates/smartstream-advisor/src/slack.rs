use std::time::Duration;

use serde::Serialize;
use smartstream_core::{SlackConfig, SmartstreamError};

use crate::input::{head_chars, tail_chars};

// Slack rejects section blocks whose text exceeds 3000 characters.
const SECTION_TEXT_LIMIT: usize = 2900;

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum NotifyOutcome {
    /// Not attempted: no bot token configured.
    Skipped,
    /// Accepted by Slack.
    Sent,
    /// Attempted and failed; the run continues regardless.
    Failed(String),
}

/// Best-effort Slack notifier using `chat.postMessage`.
///
/// Without a token every call is a logged no-op.
///
/// # Examples
///
/// ```
/// use smartstream_core::SlackConfig;
/// use smartstream_advisor::slack::SlackNotifier;
///
/// let notifier = SlackNotifier::new(&SlackConfig::default()).unwrap();
/// let payload = notifier.build_payload("Build failed", None, chrono::Utc::now());
/// assert_eq!(payload["channel"], "#devops-alerts");
/// ```
pub struct SlackNotifier {
    http: reqwest::Client,
    token: Option<String>,
    channel: String,
    api_base: String,
    excerpt_chars: usize,
    rich: bool,
}

impl SlackNotifier {
    /// Create a notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &SlackConfig) -> Result<Self, SmartstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SmartstreamError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            token: config.token.clone(),
            channel: config.channel.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            excerpt_chars: config.excerpt_chars,
            rich: config.rich,
        })
    }

    /// Post `message`, optionally with the tail of `log_excerpt`.
    ///
    /// Never fails: delivery errors are logged and reported as
    /// [`NotifyOutcome::Failed`].
    pub async fn notify(&self, message: &str, log_excerpt: Option<&str>) -> NotifyOutcome {
        let Some(token) = &self.token else {
            tracing::warn!("Slack alert skipped: SLACK_BOT_TOKEN not set");
            return NotifyOutcome::Skipped;
        };

        let payload = self.build_payload(message, log_excerpt, chrono::Utc::now());
        match self.post(token, &payload).await {
            Ok(()) => {
                tracing::info!(channel = %self.channel, "Slack alert sent");
                NotifyOutcome::Sent
            }
            Err(e) => {
                tracing::error!(channel = %self.channel, "Slack error: {e}");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Build the `chat.postMessage` body.
    ///
    /// The plain `text` field is always present; Block Kit `blocks` are added
    /// when rich payloads are enabled.
    pub fn build_payload(
        &self,
        message: &str,
        log_excerpt: Option<&str>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> serde_json::Value {
        let excerpt = log_excerpt
            .map(|log| tail_chars(log.trim_end(), self.excerpt_chars))
            .filter(|e| !e.trim().is_empty());

        let mut text = message.to_string();
        if let Some(e) = excerpt {
            text.push_str(&format!("\n\nLog excerpt:\n```{}```", fence_safe(e)));
        }

        if !self.rich {
            return serde_json::json!({
                "channel": self.channel,
                "text": text,
            });
        }

        let mut blocks = vec![
            serde_json::json!({
                "type": "header",
                "text": { "type": "plain_text", "text": "\u{1f6a8} SmartStream Alert", "emoji": true },
            }),
            serde_json::json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": head_chars(message, SECTION_TEXT_LIMIT) },
            }),
        ];
        if let Some(e) = excerpt {
            blocks.push(serde_json::json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*Log excerpt:*\n```{}```", fence_safe(e)),
                },
            }));
        }
        blocks.push(serde_json::json!({
            "type": "context",
            "elements": [
                { "type": "mrkdwn", "text": format!("Reported at {}", at.to_rfc3339()) },
            ],
        }));

        serde_json::json!({
            "channel": self.channel,
            "text": text,
            "blocks": blocks,
        })
    }

    async fn post(&self, token: &str, payload: &serde_json::Value) -> Result<(), SmartstreamError> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await
            .map_err(|e| SmartstreamError::Notification(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmartstreamError::Notification(format!(
                "Slack API error {status}: {body}"
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            SmartstreamError::Notification(format!("failed to parse Slack response: {e}"))
        })?;

        if body.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            let reason = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown_error");
            Err(SmartstreamError::Notification(reason.to_string()))
        }
    }
}

/// The alert text sent when the model could not identify a fix.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::slack::alert_message;
///
/// let msg = alert_message("no idea");
/// assert!(msg.contains("Please investigate manually."));
/// assert!(msg.ends_with("no idea"));
/// ```
pub fn alert_message(suggestion: &str) -> String {
    format!(
        "\u{1f6a8} *SmartStream Alert*:\n\
         Jenkins build failed and no specific fix was found by the AI.\n\n\
         Please investigate manually.\n\n\
         \u{1f9e0} AI Response:\n{suggestion}"
    )
}

fn fence_safe(text: &str) -> String {
    text.replace("```", "'''")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockito::Matcher;

    use super::*;

    fn notifier(token: Option<&str>, api_base: String) -> SlackNotifier {
        SlackNotifier::new(&SlackConfig {
            token: token.map(String::from),
            api_base,
            timeout_secs: 5,
            ..SlackConfig::default()
        })
        .unwrap()
    }

    fn at() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn missing_token_skips_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let n = notifier(None, server.url());
        assert_eq!(n.notify("msg", Some("log")).await, NotifyOutcome::Skipped);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn successful_post_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "channel": "#devops-alerts",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"ts":"1714550400.000100"}"#)
            .create_async()
            .await;

        let n = notifier(Some("xoxb-test"), server.url());
        assert_eq!(n.notify("msg", None).await, NotifyOutcome::Sent);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn slack_api_error_is_reported_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;

        let n = notifier(Some("xoxb-test"), server.url());
        assert_eq!(
            n.notify("msg", None).await,
            NotifyOutcome::Failed("notification error: channel_not_found".into())
        );
    }

    #[tokio::test]
    async fn unreachable_slack_is_reported_not_raised() {
        let n = notifier(Some("xoxb-test"), "http://127.0.0.1:1".into());
        assert!(matches!(
            n.notify("msg", None).await,
            NotifyOutcome::Failed(_)
        ));
    }

    #[test]
    fn plain_payload_has_no_blocks() {
        let n = SlackNotifier::new(&SlackConfig {
            rich: false,
            ..SlackConfig::default()
        })
        .unwrap();
        let payload = n.build_payload("hello", None, at());
        assert_eq!(payload["channel"], "#devops-alerts");
        assert_eq!(payload["text"], "hello");
        assert!(payload.get("blocks").is_none());
    }

    #[test]
    fn rich_payload_has_header_body_excerpt_and_context() {
        let n = notifier(Some("t"), "http://unused".into());
        let payload = n.build_payload("body text", Some("npm ERR! missing script"), at());
        let blocks = payload["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[1]["text"]["text"], "body text");
        assert!(blocks[2]["text"]["text"]
            .as_str()
            .unwrap()
            .contains("```npm ERR! missing script```"));
        assert!(blocks[3]["elements"][0]["text"]
            .as_str()
            .unwrap()
            .contains("2024-05-01T08:00:00"));
    }

    #[test]
    fn excerpt_is_tail_of_log_and_bounded() {
        let n = notifier(Some("t"), "http://unused".into());
        let log = format!("{}{}", "a".repeat(1000), "b".repeat(500));
        let payload = n.build_payload("m", Some(&log), at());
        let text = payload["text"].as_str().unwrap();
        let excerpt = text
            .split("```")
            .nth(1)
            .unwrap();
        assert_eq!(excerpt.chars().count(), 500);
        assert!(excerpt.chars().all(|c| c == 'b'));
    }

    #[test]
    fn blank_excerpt_is_omitted() {
        let n = notifier(Some("t"), "http://unused".into());
        let payload = n.build_payload("m", Some("   \n"), at());
        assert_eq!(payload["blocks"].as_array().unwrap().len(), 3);
        assert_eq!(payload["text"], "m");
    }

    #[test]
    fn excerpt_cannot_break_out_of_code_fence() {
        let n = notifier(Some("t"), "http://unused".into());
        let payload = n.build_payload("m", Some("```rm -rf```"), at());
        let text = payload["text"].as_str().unwrap();
        assert_eq!(text.matches("```").count(), 2);
    }

    #[test]
    fn alert_message_names_the_situation() {
        let msg = alert_message("We couldn't automatically identify this issue.");
        assert!(msg.contains("SmartStream Alert"));
        assert!(msg.contains("no specific fix was found by the AI"));
        assert!(msg.contains("We couldn't automatically identify this issue."));
    }
}
