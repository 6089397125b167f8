// Deterministic stand-ins for the model server used by the integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use banking_assist::AssistError;
use banking_assist::embeddings::Embedder;
use banking_assist::generation::Generator;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[path = "../../src/test_support/keyword_vector.rs"]
mod keyword_vector;

/// Bag-of-words embedder over lowercase alphanumeric tokens, sharing its
/// hashing with the unit-test fake
#[derive(Default)]
pub struct KeywordEmbedder {
    batches: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        keyword_vector::keyword_vector(text)
    }

    /// Number of multi-text embed calls, i.e. index builds
    pub fn batch_calls(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> banking_assist::Result<Vec<Vec<f32>>> {
        if texts.len() > 1 {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_id(&self) -> &str {
        "keyword-test"
    }
}

/// Replies with queued completions and records every prompt
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<Vec<banking_assist::Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        let generator = Self::default();
        generator.push(Ok(reply.to_string()));
        generator
    }

    pub fn push(&self, reply: banking_assist::Result<String>) {
        self.replies
            .lock()
            .expect("reply queue should not be poisoned")
            .push(reply);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("prompt log should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> banking_assist::Result<String> {
        self.prompts
            .lock()
            .expect("prompt log should not be poisoned")
            .push(prompt.to_string());

        let mut replies = self.replies.lock().expect("reply queue should not be poisoned");
        if replies.is_empty() {
            return Err(AssistError::Generation("no scripted reply".to_string()));
        }
        replies.remove(0)
    }
}

/// Generator that panics, for exercising the pipeline's last-resort fallback
pub struct PanickingGenerator;

#[async_trait]
impl Generator for PanickingGenerator {
    async fn generate(&self, _prompt: &str) -> banking_assist::Result<String> {
        panic!("generator exploded");
    }
}
