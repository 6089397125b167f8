// Configuration management module
// TOML settings with baked-in defaults and environment overrides

pub mod settings;


pub use settings::{
    Config, ConfigError, GenerationConfig, GuardrailConfig, LoggingConfig, OllamaConfig,
    RagConfig, SETTABLE_KEYS, ServerConfig, SimilarityConfig,
};
