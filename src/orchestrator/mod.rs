// Orchestrator module
// Single entry point: guardrails, then the dataset tier, then grounded or plain generation


use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::database::lancedb::{DATASET_TABLE, KNOWLEDGE_TABLE, model_table};
use crate::database::{LanceIndex, VectorIndex};
use crate::embeddings::Embedder;
use crate::generation::{Generator, ResponseGenerator};
use crate::guardrails::{Guardrails, Verdict};
use crate::ollama::OllamaClient;
use crate::retrieval::ContextRetriever;
use crate::router::ComplexityRouter;
use crate::similarity::DatasetMatcher;

/// Reply for blank queries
pub const EMPTY_QUERY_MESSAGE: &str = "Please ask a banking, loan, or account-related question.";

/// Reply when the pipeline fails unexpectedly
pub const SAFE_FALLBACK_MESSAGE: &str =
    "Something went wrong on our side. Please try again or contact customer care for assistance.";

/// Which tier produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Curated answer, guardrail message or fixed reply
    Dataset,
    /// Ungrounded model generation
    Slm,
    /// Generation grounded on knowledge chunks
    Rag,
}

impl Tier {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Slm => "slm",
            Self::Rag => "rag",
        }
    }
}

impl fmt::Display for Tier {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final answer for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub response: String,
    pub tier: Tier,
    /// Leading part of the grounding context, set only for [`Tier::Rag`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

impl ResolutionResult {
    #[inline]
    pub fn new(response: impl Into<String>, tier: Tier) -> Self {
        Self {
            response: response.into(),
            tier,
            sources: None,
        }
    }
}

/// Capabilities the pipeline is assembled from
pub struct Collaborators {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub dataset_index: Arc<dyn VectorIndex>,
    pub knowledge_index: Arc<dyn VectorIndex>,
}

pub struct Orchestrator {
    guardrails: Guardrails,
    matcher: DatasetMatcher,
    router: ComplexityRouter,
    retriever: ContextRetriever,
    generator: ResponseGenerator,
    sources_preview_chars: usize,
}

impl Orchestrator {
    #[inline]
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let matcher = DatasetMatcher::new(
            config.dataset_path(),
            Arc::clone(&collaborators.embedder),
            collaborators.dataset_index,
            config.similarity.threshold,
            config.similarity.top_k,
        );

        Self {
            guardrails: Guardrails::new(&config.guardrails),
            matcher,
            router: ComplexityRouter::new(&config.rag.complex_keywords),
            retriever: ContextRetriever::new(
                collaborators.embedder,
                collaborators.knowledge_index,
                config.rag.top_k,
            ),
            generator: ResponseGenerator::new(collaborators.generator),
            sources_preview_chars: config.rag.sources_preview_chars,
        }
    }

    /// Pipeline backed by the configured Ollama server and LanceDB tables.
    /// Nothing is contacted until the first query.
    #[inline]
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let client = Arc::new(OllamaClient::new(&config.ollama, &config.generation)?);
        let db_path = config.vector_database_path();
        let model = client.embedding_model();
        let dataset_index = LanceIndex::new(&db_path, model_table(DATASET_TABLE, model));
        let knowledge_index = LanceIndex::new(&db_path, model_table(KNOWLEDGE_TABLE, model));

        Ok(Self::new(
            config,
            Collaborators {
                embedder: Arc::clone(&client) as Arc<dyn Embedder>,
                generator: client,
                dataset_index: Arc::new(dataset_index),
                knowledge_index: Arc::new(knowledge_index),
            },
        ))
    }

    /// Replace the dataset tier, e.g. with one over an in-memory corpus
    #[inline]
    #[must_use]
    pub fn with_matcher(mut self, matcher: DatasetMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    #[inline]
    pub fn matcher(&self) -> &DatasetMatcher {
        &self.matcher
    }

    /// Answer a query. Never fails: unexpected errors, panics included, turn
    /// into [`SAFE_FALLBACK_MESSAGE`].
    #[inline]
    pub async fn respond(&self, query: &str) -> ResolutionResult {
        match AssertUnwindSafe(self.resolve(query)).catch_unwind().await {
            Ok(result) => {
                info!(tier = %result.tier, "Resolved query");
                result
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Pipeline failed unexpectedly: {}", detail);
                ResolutionResult::new(SAFE_FALLBACK_MESSAGE, Tier::Dataset)
            }
        }
    }

    async fn resolve(&self, query: &str) -> ResolutionResult {
        if query.trim().is_empty() {
            return ResolutionResult::new(EMPTY_QUERY_MESSAGE, Tier::Dataset);
        }

        let sanitized = match self.guardrails.evaluate_pre(query) {
            Verdict::Reject(message) => return ResolutionResult::new(message, Tier::Dataset),
            Verdict::Pass(sanitized) => sanitized,
        };

        let outcome = self.matcher.query(&sanitized).await;
        if let Some(answer) = outcome.answer {
            return ResolutionResult::new(self.guardrails.evaluate_post(&answer), Tier::Dataset);
        }
        debug!(score = ?outcome.score, "No dataset answer");

        if self.router.is_complex(&sanitized) {
            let context = self.retriever.retrieve(&sanitized).await;
            if !context.is_empty() {
                let response = self.generator.respond(&sanitized, &context).await;
                return ResolutionResult {
                    response: self.guardrails.evaluate_post(&response),
                    tier: Tier::Rag,
                    sources: Some(context.chars().take(self.sources_preview_chars).collect()),
                };
            }
            debug!("No knowledge context, answering without grounding");
        }

        let response = self.generator.respond(&sanitized, "").await;
        ResolutionResult::new(self.guardrails.evaluate_post(&response), Tier::Slm)
    }
}
