// Deterministic collaborators shared by unit tests

mod keyword_vector;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::AssistError;
use crate::database::{IndexHit, VectorIndex};
use crate::embeddings::Embedder;
use crate::generation::Generator;

/// Bag-of-words embedder over [`keyword_vector::keyword_vector`]
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        keyword_vector::keyword_vector(text)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_id(&self) -> &str {
        "keyword-test"
    }
}

/// Replies with a fixed completion
pub struct EchoGenerator(pub String);

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, _prompt: &str) -> crate::Result<String> {
        Ok(self.0.clone())
    }
}

/// Index whose every operation fails
pub struct BrokenIndex;

#[async_trait]
impl VectorIndex for BrokenIndex {
    async fn upsert(&self, _: &[String], _: &[Vec<f32>], _: &[String]) -> crate::Result<()> {
        Err(AssistError::Index("index offline".to_string()))
    }

    async fn query(&self, _: &[f32], _: usize) -> crate::Result<Vec<IndexHit>> {
        Err(AssistError::Index("index offline".to_string()))
    }

    async fn count(&self) -> crate::Result<usize> {
        Err(AssistError::Index("index offline".to_string()))
    }

    async fn clear(&self) -> crate::Result<()> {
        Err(AssistError::Index("index offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_vectors_ignore_case_and_punctuation() {
        assert_eq!(
            KeywordEmbedder::vector("How is EMI calculated?"),
            KeywordEmbedder::vector("how is emi, calculated")
        );
        assert_ne!(
            KeywordEmbedder::vector("How is EMI calculated?"),
            KeywordEmbedder::vector("How do I update KYC?")
        );
        assert_eq!(KeywordEmbedder::vector("").len(), keyword_vector::DIMENSION);
    }
}
