use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use smartstream_core::{
    Backend, InputConfig, LogSource, OutputConfig, SmartstreamConfig, SmartstreamError,
};

use crate::detect;
use crate::endpoint::EndpointClient;
use crate::input::{self, RawLog, TruncatedLog};
use crate::llm::LlmClient;
use crate::output::{self, WrittenFiles};
use crate::prompt::{self, FALLBACK_SENTENCE};
use crate::slack::{self, NotifyOutcome, SlackNotifier};

/// The remote service that turns a prompt into a suggestion.
pub enum SuggestionClient {
    /// OpenAI-compatible chat completions.
    Chat(LlmClient),
    /// Hosted inference endpoint.
    Endpoint(EndpointClient),
}

impl SuggestionClient {
    /// Build the client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] if the client cannot be constructed.
    pub fn from_config(config: &SmartstreamConfig) -> Result<Self, SmartstreamError> {
        match config.backend {
            Backend::Chat => Ok(Self::Chat(LlmClient::new(&config.llm)?)),
            Backend::Endpoint => Ok(Self::Endpoint(EndpointClient::new(&config.endpoint)?)),
        }
    }

    /// Which backend this is.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Chat(_) => Backend::Chat,
            Self::Endpoint(_) => Backend::Endpoint,
        }
    }

    /// Model name or endpoint URL, for display.
    pub fn target(&self) -> &str {
        match self {
            Self::Chat(c) => c.model(),
            Self::Endpoint(e) => e.url(),
        }
    }

    /// Send `prompt` once and return the trimmed response text.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Transport`] on any remote failure.
    pub async fn suggest(&self, prompt: &str) -> Result<String, SmartstreamError> {
        match self {
            Self::Chat(c) => c.complete(prompt).await,
            Self::Endpoint(e) => e.invoke(prompt).await,
        }
    }
}

/// Where the final suggestion text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum SuggestionOrigin {
    /// Returned by the model.
    Model,
    /// The remote call failed; the fallback sentence stands in. Holds the
    /// error category only, the detail is logged to stderr.
    Degraded(&'static str),
}

/// Map a suggestion-service result to the text the rest of the run uses.
///
/// Failures become the fallback sentence. The error detail goes to the log;
/// the returned [`SuggestionOrigin`] carries only its category.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::pipeline::{resolve_suggestion, SuggestionOrigin};
/// use smartstream_advisor::prompt::FALLBACK_SENTENCE;
/// use smartstream_core::SmartstreamError;
///
/// let (text, origin) = resolve_suggestion(Err(SmartstreamError::Transport("timeout".into())));
/// assert_eq!(text, FALLBACK_SENTENCE);
/// assert_eq!(origin, SuggestionOrigin::Degraded("transport"));
/// ```
pub fn resolve_suggestion(
    result: Result<String, SmartstreamError>,
) -> (String, SuggestionOrigin) {
    match result {
        Ok(text) => (text, SuggestionOrigin::Model),
        Err(e) => {
            tracing::error!("could not get a suggestion: {e}");
            (
                FALLBACK_SENTENCE.to_string(),
                SuggestionOrigin::Degraded(e.category()),
            )
        }
    }
}

/// Per-run switches decided by the caller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the suggestion files are written to.
    pub output_dir: PathBuf,
    /// Persist the suggestion files.
    pub write_files: bool,
    /// Dispatch a notification when the fallback is detected.
    pub notify: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            write_files: true,
            notify: true,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Suggestion text as returned (or the fallback sentence).
    pub suggestion: String,
    /// Whether the text came from the model.
    pub origin: SuggestionOrigin,
    /// Whether the fallback sentence was found in the suggestion.
    pub fallback_detected: bool,
    /// Where the log was read from.
    pub source: LogSource,
    /// Size policy outcome.
    pub log: TruncatedLog,
    /// Backend used.
    pub backend: Backend,
    /// Model name or endpoint URL.
    pub target: String,
    /// Notification outcome; `None` when no notification was due.
    pub notification: Option<NotifyOutcome>,
    /// Files written; `None` when disabled or failed.
    pub files: Option<WrittenFiles>,
    /// When the analysis finished.
    pub generated_at: DateTime<Utc>,
}

/// Drives one log through prompt, suggestion, output, and notification.
pub struct AdvisorPipeline {
    client: SuggestionClient,
    notifier: SlackNotifier,
    input: InputConfig,
    output: OutputConfig,
}

impl AdvisorPipeline {
    /// Assemble a pipeline from already-constructed collaborators.
    pub fn new(
        client: SuggestionClient,
        notifier: SlackNotifier,
        input: InputConfig,
        output: OutputConfig,
    ) -> Self {
        Self {
            client,
            notifier,
            input,
            output,
        }
    }

    /// Build every collaborator from one configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Config`] if a client cannot be built.
    pub fn from_config(config: &SmartstreamConfig) -> Result<Self, SmartstreamError> {
        Ok(Self::new(
            SuggestionClient::from_config(config)?,
            SlackNotifier::new(&config.slack)?,
            config.input.clone(),
            config.output.clone(),
        ))
    }

    /// Process one log. Infallible: every later-stage failure degrades to a
    /// logged diagnostic.
    pub async fn run(&self, log: &RawLog, options: &RunOptions) -> Analysis {
        let kept = input::truncate(&log.text, &self.input);
        let prompt = prompt::build_prompt(&kept.text);

        let (suggestion, origin) = resolve_suggestion(self.client.suggest(&prompt).await);
        let fallback_detected = detect::is_fallback(&suggestion);

        let files = if options.write_files {
            match output::write_suggestion_files(&options.output_dir, &self.output, &suggestion) {
                Ok(files) => Some(files),
                Err(e) => {
                    tracing::error!("failed to write suggestion files: {e}");
                    None
                }
            }
        } else {
            None
        };

        let notification = if fallback_detected && options.notify {
            let message = slack::alert_message(&suggestion);
            Some(self.notifier.notify(&message, Some(&log.text)).await)
        } else {
            None
        };

        Analysis {
            suggestion,
            origin,
            fallback_detected,
            source: log.source.clone(),
            log: kept,
            backend: self.client.backend(),
            target: self.client.target().to_string(),
            notification,
            files,
            generated_at: Utc::now(),
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = "\u{1f4a1} SmartStream Suggestion";
        writeln!(f, "{title}")?;
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "{}", self.suggestion)?;
        writeln!(f, "{:=<60}", "")?;

        let kept = if self.log.truncated {
            format!(
                "{} chars from {}, kept {} {}",
                self.log.original_chars, self.source, self.log.direction, self.log.kept_chars
            )
        } else {
            format!("{} chars from {}", self.log.original_chars, self.source)
        };
        writeln!(f, "Backend: {} ({}) | Log: {kept}", self.backend, self.target)?;

        if let Some(files) = &self.files {
            writeln!(
                f,
                "Saved: {}, {}",
                files.full.display(),
                files.filtered.display()
            )?;
        }
        match &self.notification {
            Some(NotifyOutcome::Sent) => writeln!(f, "Alert sent to Slack.")?,
            Some(NotifyOutcome::Skipped) => {
                writeln!(f, "No fix identified; Slack alert skipped (no token).")?
            }
            Some(NotifyOutcome::Failed(e)) => writeln!(f, "No fix identified; Slack alert failed: {e}")?,
            None => {}
        }
        Ok(())
    }
}

impl Analysis {
    /// Render the analysis as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# \u{1f4a1} SmartStream Suggestion\n\n");
        out.push_str(&format!(
            "**Backend:** {} (`{}`) | **Log:** {} chars from `{}`{}\n\n",
            self.backend,
            self.target,
            self.log.original_chars,
            self.source,
            if self.log.truncated {
                format!(" (kept {} {})", self.log.direction, self.log.kept_chars)
            } else {
                String::new()
            },
        ));
        out.push_str(&self.suggestion);
        out.push_str("\n\n");
        if self.fallback_detected {
            out.push_str("> **No actionable fix identified.** Please contact your DevOps team.\n");
        }
        out
    }
}
