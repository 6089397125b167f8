
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::AssistError;
use crate::config::{GenerationConfig, OllamaConfig};
use crate::embeddings::Embedder;
use crate::generation::Generator;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for a local Ollama server.
///
/// Serves both embeddings (`/api/embed`) and completions (`/api/generate`).
/// The async capability impls run requests on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    batch_size: u32,
    max_new_tokens: u32,
    temperature: f32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Entry of `GET /api/tags`
#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(ollama: &OllamaConfig, generation: &GenerationConfig) -> Result<Self> {
        let base_url = ollama
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(ollama.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: ollama.embedding_model.clone(),
            generation_model: ollama.generation_model.clone(),
            batch_size: ollama.batch_size.max(1),
            max_new_tokens: generation.max_new_tokens,
            temperature: generation.temperature,
            agent,
            retry_attempts: ollama.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Check the server is reachable and both configured models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let models = self.list_models().context("Ollama server is unreachable")?;
        let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();

        let missing: Vec<&str> = [self.embedding_model(), self.generation_model()]
            .into_iter()
            .filter(|model| !available.contains(model))
            .collect();
        if !missing.is_empty() {
            warn!(?missing, ?available, "Configured models not pulled");
            anyhow::bail!("Models {:?} are not available on {}", missing, self.base_url);
        }

        info!(
            embedding = %self.embedding_model,
            generation = %self.generation_model,
            "Ollama health check passed"
        );
        Ok(())
    }

    #[inline]
    pub fn ping(&self) -> Result<()> {
        self.get_text("/api/tags").map(drop)
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self.get_json("/api/tags")?;
        debug!(count = response.models.len(), "Listed Ollama models");
        Ok(response.models)
    }

    /// Embed texts in batches of the configured size, preserving order
    #[inline]
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size as usize) {
            let response: BatchEmbedResponse = self
                .post_json(
                    "/api/embed",
                    &BatchEmbedRequest {
                        model: &self.embedding_model,
                        inputs: batch,
                    },
                )
                .with_context(|| format!("Embedding batch of {} texts failed", batch.len()))?;

            if response.embeddings.len() != batch.len() {
                anyhow::bail!(
                    "Ollama returned {} embeddings for {} inputs",
                    response.embeddings.len(),
                    batch.len()
                );
            }
            vectors.extend(response.embeddings);
        }

        debug!(count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }

    /// Single non-streaming completion
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_new_tokens,
            },
        };

        let response: GenerateResponse = self
            .post_json("/api/generate", &request)
            .context("Completion request failed")?;

        debug!(chars = response.response.len(), "Received completion");
        Ok(response.response)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid Ollama endpoint {}", path))
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let url = self.endpoint(path)?;
        self.with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_text(path)?;
        serde_json::from_str(&body).with_context(|| format!("Unexpected response from {}", path))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        let payload = serde_json::to_string(body)?;

        let response = self.with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&payload)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        serde_json::from_str(&response).with_context(|| format!("Unexpected response from {}", path))
    }

    /// Retries server errors and transport failures with exponential backoff
    fn with_retry<F>(&self, mut send: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut attempt = 1;
        loop {
            let error = match send() {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            if !is_retryable(&error) {
                warn!(%error, "Ollama request failed, not retrying");
                return Err(anyhow::anyhow!("Request to {} failed: {}", self.base_url, error));
            }
            if attempt >= self.retry_attempts {
                error!(%error, attempts = attempt, "Ollama request failed");
                return Err(anyhow::anyhow!(
                    "Request to {} failed after {} attempt(s): {}",
                    self.base_url,
                    attempt,
                    error
                ));
            }

            let delay = Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
            warn!(%error, attempt, ?delay, "Retrying Ollama request");
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

fn is_retryable(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::StatusCode(status) => *status >= 500,
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => true,
        _ => false,
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        let client = self.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || client.embed_texts(&texts))
            .await
            .map_err(|e| AssistError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| AssistError::Embedding(format!("{:#}", e)))
    }

    fn model_id(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || client.complete(&prompt))
            .await
            .map_err(|e| AssistError::Generation(format!("Generation task failed: {}", e)))?
            .map_err(|e| AssistError::Generation(format!("{:#}", e)))
    }
}
