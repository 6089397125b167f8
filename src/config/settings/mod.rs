
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

pub const THRESHOLD_ENV_VAR: &str = "SIMILARITY_THRESHOLD";
pub const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";

/// Keys accepted by [`Config::set_value`]
pub const SETTABLE_KEYS: &[&str] = &[
    "ollama.protocol",
    "ollama.host",
    "ollama.port",
    "ollama.embedding_model",
    "ollama.generation_model",
    "ollama.batch_size",
    "similarity.threshold",
    "guardrails.enabled",
    "guardrails.disclaimer",
    "logging.level",
    "server.bind",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Environment overrides that could not be applied, for logging once
    /// the subscriber is installed
    #[serde(skip)]
    pub ignored_overrides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub generation_model: String,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "all-minilm:latest".to_string(),
            generation_model: "tinyllama:latest".to_string(),
            batch_size: 16,
            timeout_seconds: 120,
            retry_attempts: 1,
        }
    }
}

/// Tier 1 settings: the curated Q/A corpus and its acceptance threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    pub dataset_path: PathBuf,
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/alpaca_bfsi.json"),
            threshold: 0.88,
            top_k: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 0.3,
        }
    }
}

/// Tier 3 settings: knowledge ingestion, retrieval depth and routing keywords
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    pub knowledge_path: PathBuf,
    pub top_k: usize,
    pub complex_keywords: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sources_preview_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_path: PathBuf::from("knowledge"),
            top_k: 3,
            complex_keywords: to_strings(&["emi", "interest", "rate", "penalty", "policy"]),
            chunk_size: 512,
            chunk_overlap: 64,
            sources_preview_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailConfig {
    pub enabled: bool,
    pub disclaimer: String,
    pub sensitive_data_message: String,
    pub unsafe_intent_message: String,
    pub out_of_domain_message: String,
    pub domain_keywords: Vec<String>,
    pub unsafe_keywords: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disclaimer: String::new(),
            sensitive_data_message: "For your security, please do not share account numbers or personal IDs in the chat. You may contact our helpline for account-specific queries.".to_string(),
            unsafe_intent_message: "We can only assist with legitimate ways to improve or manage your credit score and financial health. We do not provide guidance on manipulating, misrepresenting, or falsifying any information. If you would like to know how to improve your credit score, correct errors in your report, reduce debt, or understand your score, please ask and we will be happy to help.".to_string(),
            out_of_domain_message: "I can only help with banking, loan, and account-related queries. Please ask a question in that domain.".to_string(),
            domain_keywords: to_strings(&[
                "loan", "emi", "interest", "rate", "payment", "account", "bank", "balance",
                "eligibility", "application", "statement", "transfer", "card", "kyc",
                "foreclosure", "prepayment", "tenure", "disbursement", "sanction",
                "home loan", "personal loan", "savings", "fd", "nre", "nro", "nominee",
                "net banking", "customer care", "branch", "complaint", "penalty", "policy",
                "finance", "financial", "insurance", "invest", "deposit", "withdraw",
                "credit", "debit", "atm", "cheque", "draft", "neft", "imps", "rtgs",
                "overdraft", "mortgage", "refinance", "repay", "outstanding", "due",
                "help", "support", "query", "question", "information", "details",
            ]),
            unsafe_keywords: to_strings(&[
                "manipulate", "manipulation", "cheat", "fake", "forge", "forged", "falsify",
                "hack", "rig", "game the system", "trick the system", "fraud", "fraudulent",
                "illegal", "unethical", "misrepresent", "hide debt", "conceal",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `serve` listener
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid similarity threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidThreshold(f32),
    #[error("Invalid {0} top_k: {1} (must be between 1 and 100)")]
    InvalidTopK(&'static str, usize),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid chunk size: {0} (must be between 16 and 8192 words)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    ChunkOverlapTooLarge(usize, usize),
    #[error("Keyword list '{0}' must contain at least one non-blank term")]
    EmptyKeywords(&'static str),
    #[error("Invalid bind address: {0} (expected host:port)")]
    InvalidBind(String),
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),
    #[error("Invalid value '{1}' for {0}")]
    InvalidValue(String, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".banking-assist"))
            .or_else(|| dirs::data_dir().map(|data| data.join("banking-assist")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Read `config.toml` from `config_dir`, apply environment overrides and
    /// validate. A missing file yields the defaults.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let mut config = Self::read_file(config_dir.as_ref())?;
        config.ignored_overrides = config.apply_env_overrides();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Like [`Config::load`] but without environment overrides, for editing
    /// the file in place
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config = Self::read_file(config_dir.as_ref())?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    fn read_file(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str::<Config>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.to_path_buf();
        Ok(config)
    }

    /// Apply `SIMILARITY_THRESHOLD` and `LOG_LEVEL` from the environment.
    /// Returns a description of every value that was ignored.
    #[inline]
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        let mut ignored = Vec::new();

        if let Ok(raw) = env::var(THRESHOLD_ENV_VAR) {
            match raw.trim().parse::<f32>() {
                Ok(threshold) => self.similarity.threshold = threshold,
                Err(_) => ignored.push(format!(
                    "Ignoring unparsable {}={:?}",
                    THRESHOLD_ENV_VAR, raw
                )),
            }
        }

        if let Ok(level) = env::var(LOG_LEVEL_ENV_VAR) {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_lowercase();
            }
        }

        ignored
    }

    /// Change one setting by its dotted key (see [`SETTABLE_KEYS`]). The
    /// owning section is validated before the change is kept.
    #[inline]
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "ollama.protocol" => self.ollama.set_protocol(value.to_string()),
            "ollama.host" => self.ollama.set_host(value.to_string()),
            "ollama.port" => self.ollama.set_port(parse_value(key, value)?),
            "ollama.embedding_model" => self.ollama.set_embedding_model(value.to_string()),
            "ollama.generation_model" => self.ollama.set_generation_model(value.to_string()),
            "ollama.batch_size" => self.ollama.set_batch_size(parse_value(key, value)?),
            "similarity.threshold" => {
                let similarity = SimilarityConfig {
                    threshold: parse_value(key, value)?,
                    ..self.similarity.clone()
                };
                similarity.validate()?;
                self.similarity = similarity;
                Ok(())
            }
            "guardrails.enabled" => {
                self.guardrails.enabled = parse_value(key, value)?;
                Ok(())
            }
            "guardrails.disclaimer" => {
                self.guardrails.disclaimer = value.to_string();
                Ok(())
            }
            "logging.level" => {
                if value.is_empty() {
                    return Err(ConfigError::InvalidValue(key.to_string(), value.to_string()));
                }
                self.logging.level = value.to_lowercase();
                Ok(())
            }
            "server.bind" => {
                let server = ServerConfig {
                    bind: value.to_string(),
                };
                server.validate()?;
                self.server = server;
                Ok(())
            }
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.similarity.validate()?;
        self.generation.validate()?;
        self.rag.validate()?;
        self.guardrails.validate()?;
        self.server.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Curated Q/A corpus, resolved against the base directory when relative
    #[inline]
    pub fn dataset_path(&self) -> PathBuf {
        self.resolve(&self.similarity.dataset_path)
    }

    /// Directory of markdown documents ingested for retrieval
    #[inline]
    pub fn knowledge_path(&self) -> PathBuf {
        self.resolve(&self.rag.knowledge_path)
    }

    /// Get the path for the vector database directory
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_base_dir().join(path)
        }
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    #[inline]
    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_generation_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.generation_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl SimilarityConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }

        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK("similarity", self.top_k));
        }

        Ok(())
    }
}

impl GenerationConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        Ok(())
    }
}

impl RagConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK("rag", self.top_k));
        }

        if !(16..=8192).contains(&self.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::ChunkOverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        if !has_terms(&self.complex_keywords) {
            return Err(ConfigError::EmptyKeywords("complex_keywords"));
        }

        Ok(())
    }
}

impl GuardrailConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !has_terms(&self.domain_keywords) {
            return Err(ConfigError::EmptyKeywords("domain_keywords"));
        }

        if !has_terms(&self.unsafe_keywords) {
            return Err(ConfigError::EmptyKeywords("unsafe_keywords"));
        }

        Ok(())
    }
}

impl ServerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.bind.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
            _ => Err(ConfigError::InvalidBind(self.bind.clone())),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))
}

fn has_terms(terms: &[String]) -> bool {
    terms.iter().any(|term| !term.trim().is_empty())
}

fn to_strings(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|term| (*term).to_string()).collect()
}
