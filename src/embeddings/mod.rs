// Embeddings module
// Embedding capability consumed by the resolution tiers, plus knowledge chunking

pub mod chunking;

use async_trait::async_trait;

pub use chunking::{ChunkingConfig, KnowledgeChunk, chunk_words, normalize_whitespace};

/// Maps text to fixed-length vectors.
///
/// Implementations must be deterministic for a given [`Embedder::model_id`]:
/// vectors stored in an index are only comparable with query vectors produced
/// by the same model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, preserving input order
    async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;

    /// Identity of the model producing the vectors
    fn model_id(&self) -> &str;
}

/// Embed a single text
#[inline]
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> crate::Result<Vec<f32>> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| crate::AssistError::Embedding("embedder returned no vectors".to_string()))
}
