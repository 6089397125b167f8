// Generation module
// Prompt construction and the degrading wrapper around a text generator


use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Returned whenever the generator fails or produces nothing usable
pub const GENERATION_FALLBACK: &str = "I could not generate a specific response for that. \
Please rephrase your question, or contact our customer care for detailed assistance.";

const PLAIN_PREAMBLE: &str = "Below is an instruction that describes a task. \
Write a response that appropriately completes the request.";

const CONTEXT_PREAMBLE: &str = "Below is an instruction that describes a task, along with \
context from our knowledge base. Write a response that uses only the context when giving \
specific numbers or policies.";

/// Produces a completion for a prompt. May fail.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// Build an instruction prompt, with a context section when `context` is non-blank
#[inline]
pub fn build_prompt(instruction: &str, input: &str, context: &str) -> String {
    let input = if input.trim().is_empty() { "N/A" } else { input };

    if context.trim().is_empty() {
        format!(
            "{PLAIN_PREAMBLE}\n\n### Instruction:\n{instruction}\n\n### Input:\n{input}\n\n### Response:\n"
        )
    } else {
        format!(
            "{CONTEXT_PREAMBLE}\n\n### Context:\n{context}\n\n### Instruction:\n{instruction}\n\n### Input:\n{input}\n\n### Response:\n"
        )
    }
}

/// Generator wrapper that never fails: errors and blank completions become
/// [`GENERATION_FALLBACK`].
#[derive(Clone)]
pub struct ResponseGenerator {
    generator: Arc<dyn Generator>,
}

impl ResponseGenerator {
    #[inline]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Answer `instruction`, grounding on `context` when it is non-empty
    #[inline]
    pub async fn respond(&self, instruction: &str, context: &str) -> String {
        let prompt = build_prompt(instruction, "", context);
        debug!(
            grounded = !context.is_empty(),
            prompt_chars = prompt.len(),
            "Generating response"
        );

        match self.generator.generate(&prompt).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!("Generator returned an empty completion");
                    GENERATION_FALLBACK.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                GENERATION_FALLBACK.to_string()
            }
        }
    }
}
