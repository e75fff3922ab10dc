use std::io::Read;
use std::path::Path;

use serde::Serialize;
use smartstream_core::{InputConfig, LogSource, SmartstreamError, TruncationDirection};

/// A build log exactly as read, before any size policy is applied.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::input::RawLog;
/// use smartstream_core::LogSource;
///
/// let log = RawLog::from_reader("BUILD FAILED".as_bytes()).unwrap();
/// assert_eq!(log.source, LogSource::Stdin);
/// assert_eq!(log.text, "BUILD FAILED");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Where the log came from.
    pub source: LogSource,
    /// Full log content.
    pub text: String,
}

impl RawLog {
    /// Read a log from a named file.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected; Jenkins
    /// consoles routinely contain raw bytes from tool output.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::FileNotFound`] when `path` is not a regular
    /// file, [`SmartstreamError::Io`] when it cannot be read, and
    /// [`SmartstreamError::Input`] when it holds only whitespace.
    pub fn from_file(path: &Path) -> Result<Self, SmartstreamError> {
        if !path.is_file() {
            return Err(SmartstreamError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Self::new(LogSource::File(path.to_path_buf()), text)
    }

    /// Read a log from any reader, normally standard input.
    ///
    /// # Errors
    ///
    /// Returns [`SmartstreamError::Io`] on read failure and
    /// [`SmartstreamError::Input`] when the stream holds only whitespace.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, SmartstreamError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Self::new(LogSource::Stdin, text)
    }

    fn new(source: LogSource, text: String) -> Result<Self, SmartstreamError> {
        if text.trim().is_empty() {
            return Err(SmartstreamError::Input(format!("log from {source} is empty")));
        }
        Ok(Self { source, text })
    }

    /// Number of characters (Unicode scalar values) in the log.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// The slice of a log that is embedded in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncatedLog {
    /// Kept text; at most `max_chars` characters.
    #[serde(skip)]
    pub text: String,
    /// Character count of the raw log.
    pub original_chars: usize,
    /// Character count of the kept text.
    pub kept_chars: usize,
    /// Whether anything was dropped.
    pub truncated: bool,
    /// Which end was kept.
    pub direction: TruncationDirection,
}

/// Apply the configured size policy to a raw log.
///
/// Logs at or under `max_chars` characters pass through unchanged; longer
/// logs keep exactly `max_chars` characters from the configured end.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::input::truncate;
/// use smartstream_core::{InputConfig, TruncationDirection};
///
/// let policy = InputConfig { max_chars: 4, direction: TruncationDirection::Tail };
/// let kept = truncate("abcdefgh", &policy);
/// assert_eq!(kept.text, "efgh");
/// assert!(kept.truncated);
/// ```
pub fn truncate(raw: &str, policy: &InputConfig) -> TruncatedLog {
    let original_chars = raw.chars().count();
    let text = match policy.direction {
        TruncationDirection::Tail => tail_chars(raw, policy.max_chars),
        TruncationDirection::Head => head_chars(raw, policy.max_chars),
    };
    let kept_chars = original_chars.min(policy.max_chars);
    if kept_chars < original_chars {
        tracing::debug!(
            original_chars,
            kept_chars,
            direction = %policy.direction,
            "log truncated"
        );
    }
    TruncatedLog {
        text: text.to_string(),
        original_chars,
        kept_chars,
        truncated: kept_chars < original_chars,
        direction: policy.direction,
    }
}

/// The last `n` characters of `text`, or all of it when shorter.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::input::tail_chars;
///
/// assert_eq!(tail_chars("héllo", 4), "éllo");
/// assert_eq!(tail_chars("hi", 10), "hi");
/// ```
pub fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if total <= n {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// The first `n` characters of `text`, or all of it when shorter.
pub fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
