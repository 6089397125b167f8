// Complexity router
// Decides whether a query needs knowledge-base grounding

use tracing::debug;

/// Flags queries that mention figures or policies the model should not guess
#[derive(Debug, Clone)]
pub struct ComplexityRouter {
    keywords: Vec<String>,
}

impl ComplexityRouter {
    #[inline]
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// True iff the query contains any configured keyword, ignoring case
    #[inline]
    pub fn is_complex(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let complex = self.keywords.iter().any(|k| query.contains(k.as_str()));
        debug!(complex, "Routed query");
        complex
    }
}

impl Default for ComplexityRouter {
    #[inline]
    fn default() -> Self {
        Self::new(&crate::config::RagConfig::default().complex_keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keywords_flag_rate_questions() {
        let router = ComplexityRouter::default();

        assert!(router.is_complex("What is the prepayment PENALTY?"));
        assert!(router.is_complex("current interest on FD"));
        assert!(router.is_complex("How is EMI calculated?"));
        assert!(!router.is_complex("How do I update KYC?"));
    }

    #[test]
    fn substring_semantics() {
        // "rate" inside "corporate"
        assert!(ComplexityRouter::default().is_complex("corporate account opening"));
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let router = ComplexityRouter::new(&["Tariff".to_string(), "  ".to_string()]);

        assert!(router.is_complex("show the tariff card"));
        assert!(!router.is_complex("What is the interest rate?"));
        assert!(!router.is_complex(""));
    }
}
