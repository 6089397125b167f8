// Guardrails module
// Input screening before any tier runs and output clean-up after generation

pub mod patterns;


use tracing::{info, warn};

use crate::config::GuardrailConfig;

/// Outcome of screening a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Stop processing and answer with this message
    Reject(String),
    /// Continue with the trimmed query
    Pass(String),
}

/// Keyword and pattern based input/output filter.
///
/// Keyword checks are case-insensitive substring matches. Screening order is
/// sensitive data, then unsafe intent, then domain scope; the first hit wins.
#[derive(Debug, Clone)]
pub struct Guardrails {
    enabled: bool,
    disclaimer: String,
    sensitive_data_message: String,
    unsafe_intent_message: String,
    out_of_domain_message: String,
    domain_keywords: Vec<String>,
    unsafe_keywords: Vec<String>,
}

impl Guardrails {
    #[inline]
    pub fn new(config: &GuardrailConfig) -> Self {
        Self {
            enabled: config.enabled,
            disclaimer: config.disclaimer.clone(),
            sensitive_data_message: config.sensitive_data_message.clone(),
            unsafe_intent_message: config.unsafe_intent_message.clone(),
            out_of_domain_message: config.out_of_domain_message.clone(),
            domain_keywords: lowercase_terms(&config.domain_keywords),
            unsafe_keywords: lowercase_terms(&config.unsafe_keywords),
        }
    }

    /// Screen a query before it reaches any tier
    #[inline]
    pub fn evaluate_pre(&self, query: &str) -> Verdict {
        if !self.enabled {
            return Verdict::Pass(query.trim().to_string());
        }

        // Never log the query itself past this point
        if patterns::contains_sensitive_identifier(query) {
            warn!("Query rejected: possible sensitive identifier detected");
            return Verdict::Reject(self.sensitive_data_message.clone());
        }

        if self.has_unsafe_intent(query) {
            warn!("Query rejected: unsafe or unethical intent detected");
            return Verdict::Reject(self.unsafe_intent_message.clone());
        }

        if self.is_out_of_domain(query) {
            info!("Query rejected: out of domain");
            return Verdict::Reject(self.out_of_domain_message.clone());
        }

        Verdict::Pass(query.trim().to_string())
    }

    /// Clean up a response before it is returned
    #[inline]
    pub fn evaluate_post(&self, response: &str) -> String {
        if !self.enabled {
            return response.to_string();
        }

        let reframed = if response.trim().is_empty() {
            response.to_string()
        } else {
            patterns::reframe_unsafe_echoes(response)
        };

        if self.disclaimer.is_empty() || reframed.is_empty() {
            reframed
        } else {
            format!("{}\n\n{}", reframed.trim_end(), self.disclaimer)
        }
    }

    #[inline]
    pub fn has_unsafe_intent(&self, query: &str) -> bool {
        if query.trim().is_empty() {
            return false;
        }
        contains_any(&query.to_lowercase(), &self.unsafe_keywords)
    }

    /// Blank queries are always out of domain
    #[inline]
    pub fn is_out_of_domain(&self, query: &str) -> bool {
        if query.trim().is_empty() {
            return true;
        }
        !contains_any(&query.to_lowercase(), &self.domain_keywords)
    }
}

fn lowercase_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn contains_any(haystack: &str, terms: &[String]) -> bool {
    terms.iter().any(|term| haystack.contains(term.as_str()))
}
