/// The sentence the model is told to answer with when it finds no root cause.
///
/// The fallback detector matches this byte-for-byte, so it must stay in sync
/// with [`PROMPT_TEMPLATE`].
pub const FALLBACK_SENTENCE: &str =
    "We couldn't automatically identify this issue. Please contact your DevOps team: devops@example.com";

/// Marker token prefixing actionable lines in the model's answer.
pub const SUGGESTION_MARKER: &str = ">>> Suggestion:";

/// Instruction template; `{log_content}` is replaced with the build log.
pub const PROMPT_TEMPLATE: &str = "\
You are an AI assistant helping developers debug CI/CD build failures.

Below is a Jenkins build log. Analyze the error and suggest 2-3 possible solutions in a numbered list.

LOG:
----------------------------------------
{log_content}
----------------------------------------

>>> Suggestion:
- If you can identify the root cause, suggest specific fixes.
- If you're uncertain or no actionable solution exists, reply:
>>> Suggestion: {fallback}
";

/// Build the prompt sent to the suggestion service.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::prompt::{build_prompt, FALLBACK_SENTENCE};
///
/// let prompt = build_prompt("npm ERR! missing script: test");
/// assert!(prompt.contains("npm ERR! missing script: test"));
/// assert!(prompt.contains(FALLBACK_SENTENCE));
/// ```
pub fn build_prompt(log: &str) -> String {
    // Fallback first: a log that happens to contain "{fallback}" must survive verbatim.
    PROMPT_TEMPLATE
        .replace("{fallback}", FALLBACK_SENTENCE)
        .replacen("{log_content}", log, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_key_instructions() {
        let prompt = build_prompt("x");
        assert!(prompt.contains("CI/CD build failures"));
        assert!(prompt.contains("2-3 possible solutions"));
        assert!(prompt.contains("numbered list"));
        assert!(prompt.contains(SUGGESTION_MARKER));
    }

    #[test]
    fn prompt_embeds_log_verbatim() {
        let log = "Step 4/9 : RUN npm ci\nnpm ERR! code ERESOLVE\n  at /app/package.json";
        let prompt = build_prompt(log);
        assert!(prompt.contains(log));
    }

    #[test]
    fn prompt_always_carries_fallback_sentence() {
        for log in ["", "ok", "{log_content}", "{fallback}"] {
            let prompt = build_prompt(log);
            assert!(prompt.contains(FALLBACK_SENTENCE), "missing for {log:?}");
        }
    }

    #[test]
    fn placeholder_text_inside_log_is_not_expanded() {
        let prompt = build_prompt("echo {fallback}");
        assert!(prompt.contains("echo {fallback}"));
    }

    #[test]
    fn no_placeholders_left_behind() {
        let prompt = build_prompt("log");
        assert!(!prompt.contains("{log_content}"));
        assert!(!prompt.contains("{fallback}"));
    }
}
