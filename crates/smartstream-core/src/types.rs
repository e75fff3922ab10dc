use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which remote text-generation service produces the suggestion.
///
/// # Examples
///
/// ```
/// use smartstream_core::Backend;
///
/// let backend: Backend = "sagemaker".parse().unwrap();
/// assert_eq!(backend, Backend::Endpoint);
/// assert_eq!(Backend::default(), Backend::Chat);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI-compatible chat completions API.
    #[default]
    Chat,
    /// Hosted inference endpoint taking `{"inputs": prompt}`.
    Endpoint,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Chat => write!(f, "chat"),
            Backend::Endpoint => write!(f, "endpoint"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" | "openai" => Ok(Backend::Chat),
            "endpoint" | "sagemaker" => Ok(Backend::Endpoint),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Which end of an oversized log is kept.
///
/// Build logs carry failure detail near the end, so [`TruncationDirection::Tail`]
/// is the default.
///
/// # Examples
///
/// ```
/// use smartstream_core::TruncationDirection;
///
/// assert_eq!(TruncationDirection::default(), TruncationDirection::Tail);
/// assert_eq!("head".parse::<TruncationDirection>().unwrap(), TruncationDirection::Head);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationDirection {
    /// Keep the first `max_chars` characters.
    Head,
    /// Keep the last `max_chars` characters.
    #[default]
    Tail,
}

impl fmt::Display for TruncationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationDirection::Head => write!(f, "head"),
            TruncationDirection::Tail => write!(f, "tail"),
        }
    }
}

impl FromStr for TruncationDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head" => Ok(TruncationDirection::Head),
            "tail" => Ok(TruncationDirection::Tail),
            other => Err(format!("unknown truncation direction: {other}")),
        }
    }
}

/// Where the build log was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "path")]
pub enum LogSource {
    /// A named file given on the command line.
    File(PathBuf),
    /// Standard input.
    Stdin,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::File(path) => write!(f, "{}", path.display()),
            LogSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

/// Console output format.
///
/// # Examples
///
/// ```
/// use smartstream_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Framed, human-readable suggestion.
    #[default]
    Text,
    /// Machine-readable JSON report with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
