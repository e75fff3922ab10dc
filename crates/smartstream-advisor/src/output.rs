use std::path::{Path, PathBuf};

use serde::Serialize;
use smartstream_core::{OutputConfig, SmartstreamError};

use crate::prompt::{FALLBACK_SENTENCE, SUGGESTION_MARKER};

/// Prefix of a list item that counts as an actionable line.
pub const LIST_ITEM_MARKER: &str = "- ";

/// Emoji and pictograph blocks removed by [`strip_emoji`].
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F1E0, 0x1F1FF), // regional indicators (flags)
    (0x1F900, 0x1F9FF), // supplemental symbols & pictographs
    (0x1FA70, 0x1FAFF), // symbols & pictographs extended-A
    (0x1F700, 0x1F77F), // alchemical
    (0x1F780, 0x1F7FF), // geometric shapes extended
    (0x1F800, 0x1F8FF), // supplemental arrows-C
    (0x2600, 0x26FF),   // miscellaneous symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B00, 0x2BFF),   // misc symbols and arrows
    (0xFE00, 0xFE0F),   // variation selectors
    (0x200D, 0x200D),   // zero width joiner
    (0x20E3, 0x20E3),   // combining enclosing keycap
];

/// Remove emoji and pictographs, leaving ASCII and Latin text untouched.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::output::strip_emoji;
///
/// assert_eq!(strip_emoji("🚨 Build café failed ✅"), " Build café failed ");
/// ```
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Keep only lines that start with the suggestion marker or a `- ` list item.
///
/// Leading whitespace is ignored when matching. When nothing qualifies the
/// fallback sentence is returned instead.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::output::filter_actionable;
///
/// let text = "Analysis:\n- Add a test script\nThanks";
/// assert_eq!(filter_actionable(text), "- Add a test script");
/// ```
pub fn filter_actionable(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| {
            let l = line.trim_start();
            l.starts_with(SUGGESTION_MARKER) || l.starts_with(LIST_ITEM_MARKER)
        })
        .collect();

    if kept.is_empty() {
        FALLBACK_SENTENCE.to_string()
    } else {
        kept.join("\n")
    }
}

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenFiles {
    /// Full suggestion.
    pub full: PathBuf,
    /// Actionable lines only.
    pub filtered: PathBuf,
}

/// Persist the suggestion under `dir`, overwriting previous runs.
///
/// # Errors
///
/// Returns [`SmartstreamError::Io`] if either file cannot be written.
pub fn write_suggestion_files(
    dir: &Path,
    config: &OutputConfig,
    suggestion: &str,
) -> Result<WrittenFiles, SmartstreamError> {
    let text = if config.strip_emoji {
        strip_emoji(suggestion)
    } else {
        suggestion.to_string()
    };

    let full = dir.join(&config.full_file);
    std::fs::write(&full, format!("{text}\n"))?;

    let filtered = dir.join(&config.filtered_file);
    std::fs::write(&filtered, format!("{}\n", filter_actionable(&text)))?;

    tracing::debug!(full = %full.display(), filtered = %filtered.display(), "suggestion files written");
    Ok(WrittenFiles { full, filtered })
}
