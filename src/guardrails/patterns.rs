use fancy_regex::Regex;
use std::sync::LazyLock;

/// Four groups of four digits, optionally space separated (national ID)
static GROUPED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\s?\d{4}\s?\d{4}\s?\d{4}\b").expect("valid regex"));

/// Ten or more consecutive digits (account numbers)
static LONG_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{10,}\b").expect("valid regex"));

/// Phrases in generated text that echo manipulative intent, with their safe rewording
static UNSAFE_ECHOES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\bmanipulate\s+(?:the\s+)?credit\s+score").expect("valid regex"),
            "improve your credit score",
        ),
        (
            Regex::new(r"(?i)\bmanipulat(?:e|ing)\s+(?:the\s+)?(?:credit\s+)?system")
                .expect("valid regex"),
            "improving your credit",
        ),
        (
            Regex::new(r"(?i)\bto\s+manipulate\b").expect("valid regex"),
            "to improve",
        ),
    ]
});

/// True if `text` looks like it carries an account number or personal ID.
///
/// A regex that hits its backtrack limit counts as a match.
#[inline]
pub fn contains_sensitive_identifier(text: &str) -> bool {
    [&*GROUPED_ID, &*LONG_DIGIT_RUN]
        .iter()
        .any(|regex| regex.is_match(text).unwrap_or(true))
}

/// Apply every unsafe-echo substitution in order
#[inline]
pub fn reframe_unsafe_echoes(text: &str) -> String {
    UNSAFE_ECHOES
        .iter()
        .fold(text.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).to_string()
        })
}
