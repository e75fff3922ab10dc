use crate::prompt::FALLBACK_SENTENCE;

/// Whether the model answered with the fallback sentence.
///
/// Exact, case-sensitive substring containment. Paraphrases do not count.
///
/// # Examples
///
/// ```
/// use smartstream_advisor::detect::is_fallback;
///
/// assert!(is_fallback(
///     ">>> Suggestion: We couldn't automatically identify this issue. \
///      Please contact your DevOps team: devops@example.com"
/// ));
/// assert!(!is_fallback("1. Add a test script to package.json"));
/// ```
pub fn is_fallback(suggestion: &str) -> bool {
    suggestion.contains(FALLBACK_SENTENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_sentence_is_detected() {
        assert!(is_fallback(FALLBACK_SENTENCE));
    }

    #[test]
    fn sentence_embedded_in_longer_text_is_detected() {
        let text = format!("After reviewing the log:\n>>> Suggestion: {FALLBACK_SENTENCE}\nThanks");
        assert!(is_fallback(&text));
    }

    #[test]
    fn paraphrase_is_not_detected() {
        assert!(!is_fallback(
            "we could not identify this issue, please contact devops"
        ));
        assert!(!is_fallback(
            "We couldn't automatically identify this issue."
        ));
    }

    #[test]
    fn case_differences_are_not_detected() {
        assert!(!is_fallback(&FALLBACK_SENTENCE.to_uppercase()));
    }

    #[test]
    fn ordinary_fix_list_is_not_detected() {
        assert!(!is_fallback(
            "1. Add a test script to package.json\n2. Verify npm version"
        ));
        assert!(!is_fallback(""));
    }
}
