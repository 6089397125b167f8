use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod dataset;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod guardrails;
pub mod ingest;
pub mod ollama;
pub mod orchestrator;
pub mod retrieval;
pub mod router;
pub mod server;
pub mod similarity;

#[cfg(test)]
mod test_support;

pub use orchestrator::{Orchestrator, ResolutionResult, Tier};
