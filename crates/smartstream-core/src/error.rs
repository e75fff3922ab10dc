use std::path::PathBuf;

/// Errors that can occur across SmartStream.
///
/// Only [`SmartstreamError::Config`], [`SmartstreamError::Input`] and
/// [`SmartstreamError::FileNotFound`] end a run. Transport and
/// notification failures are absorbed by the pipeline and only logged.
///
/// # Examples
///
/// ```
/// use smartstream_core::SmartstreamError;
///
/// let err = SmartstreamError::Config("OPENAI_API_KEY not set".into());
/// assert!(err.to_string().contains("OPENAI_API_KEY"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SmartstreamError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required credential or setting is missing or invalid.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(smartstream::config),
        help("set the variable in the environment or in .smartstream.toml (see `smartstream init`)")
    )]
    Config(String),

    /// The build log could not be obtained.
    #[error("input error: {0}")]
    #[diagnostic(
        code(smartstream::input),
        help("usage: smartstream <log_file>  or  <command> | smartstream")
    )]
    Input(String),

    /// The suggestion service could not be reached or answered with an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The chat channel rejected or never received a notification.
    #[error("notification error: {0}")]
    Notification(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The log file does not exist or is not a regular file.
    #[error("log file not found: {}", .0.display())]
    #[diagnostic(
        code(smartstream::input),
        help("usage: smartstream <log_file>  or  <command> | smartstream")
    )]
    FileNotFound(PathBuf),
}

impl SmartstreamError {
    /// Short, stable name of the error kind, safe to put in reports.
    ///
    /// Unlike `Display`, this never carries upstream response bodies.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartstream_core::SmartstreamError;
    ///
    /// let err = SmartstreamError::Transport("LLM API error 500: {\"detail\":\"...\"}".into());
    /// assert_eq!(err.category(), "transport");
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            SmartstreamError::Io(_) => "io",
            SmartstreamError::Config(_) => "configuration",
            SmartstreamError::Input(_) | SmartstreamError::FileNotFound(_) => "input",
            SmartstreamError::Transport(_) => "transport",
            SmartstreamError::Notification(_) => "notification",
            SmartstreamError::Serialization(_) | SmartstreamError::Toml(_) => "serialization",
        }
    }
}
