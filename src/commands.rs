use anyhow::{Context, Result};
use console::style;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::{Config, SETTABLE_KEYS};
use crate::database::lancedb::{DATASET_TABLE, KNOWLEDGE_TABLE, model_table};
use crate::database::{LanceIndex, VectorIndex};
use crate::dataset::{load_samples, validate_dataset as validate_dataset_file};
use crate::embeddings::ChunkingConfig;
use crate::ingest::KnowledgeIngestor;
use crate::ollama::OllamaClient;
use crate::{Orchestrator, ResolutionResult};

/// Render a result the way the interactive front ends print it
#[inline]
pub fn format_result(result: &ResolutionResult) -> String {
    format!(
        "[{}] {}",
        result.tier.as_str().to_uppercase(),
        result.response
    )
}

/// Words that end an interactive session
#[inline]
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "" | "quit" | "exit" | "q")
}

/// Answer a single query
#[inline]
pub async fn ask(config: &Config, query: &str, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let result = orchestrator.respond(query).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        println!("{}", format_result(&result));
        if let Some(sources) = &result.sources {
            println!();
            println!("{}", style("Sources:").bold());
            println!("{}", style(sources).dim());
        }
    }

    Ok(())
}

/// Interactive question loop on stdin
#[inline]
pub async fn chat(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{}",
        style("Banking assistant. Type your question and press Enter. 'quit' to exit.").bold()
    );
    println!();

    loop {
        print!("{} ", style("You:").cyan().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let result = orchestrator.respond(&line).await;
        println!("{}", format_result(&result));
        println!();
    }

    Ok(())
}

/// Build or validate the curated-answer index ahead of the first query
#[inline]
pub async fn build_index(config: &Config) -> Result<()> {
    let dataset_path = config.dataset_path();
    println!(
        "Building dataset index from {}",
        style(dataset_path.display()).cyan()
    );

    let orchestrator = Orchestrator::from_config(config)?;
    let count = orchestrator
        .matcher()
        .ensure_index()
        .await
        .context("Failed to build dataset index")?;

    println!(
        "{} Dataset index ready with {} samples at {}",
        style("✓").green(),
        style(count).cyan(),
        style(config.vector_database_path().display()).dim()
    );
    Ok(())
}

/// Chunk and embed the knowledge base into the retrieval index
#[inline]
pub async fn ingest(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let knowledge_path = path.unwrap_or_else(|| config.knowledge_path());
    info!("Ingesting knowledge from {}", knowledge_path.display());

    let client = Arc::new(OllamaClient::new(&config.ollama, &config.generation)?);
    let index = Arc::new(LanceIndex::new(
        config.vector_database_path(),
        model_table(KNOWLEDGE_TABLE, client.embedding_model()),
    ));
    let ingestor = KnowledgeIngestor::new(client, index, ChunkingConfig::from(&config.rag))
        .with_batch_size(config.ollama.batch_size as usize);

    let report = ingestor
        .ingest(&knowledge_path)
        .await
        .context("Failed to ingest knowledge base")?;

    if report.chunks == 0 {
        println!(
            "{} No markdown content found under {}",
            style("⚠").yellow(),
            style(knowledge_path.display()).cyan()
        );
    } else {
        println!(
            "{} Ingested {} chunks from {} files",
            style("✓").green(),
            style(report.chunks).cyan(),
            style(report.files).cyan()
        );
    }
    Ok(())
}

/// Check the curated dataset's schema and size
#[inline]
pub fn validate_dataset(config: &Config, path: Option<&Path>, min_samples: usize) -> Result<()> {
    let dataset_path = path.map_or_else(|| config.dataset_path(), Path::to_path_buf);
    let report = validate_dataset_file(&dataset_path, min_samples)
        .with_context(|| format!("Dataset {} is invalid", dataset_path.display()))?;

    println!(
        "{} Valid: {} samples ({} with input), instruction format",
        style("✓").green(),
        style(report.samples).cyan(),
        report.with_input
    );
    Ok(())
}

/// Report index sizes and model server health
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("Banking Assist Status").bold().cyan());
    println!("{}", "=".repeat(50));
    println!();

    println!("{}", style("Model server:").bold().yellow());
    match OllamaClient::new(&config.ollama, &config.generation) {
        Ok(client) => match client.ping().and_then(|()| client.health_check()) {
            Ok(()) => {
                println!(
                    "   {} Ollama: Connected ({}:{})",
                    style("✓").green(),
                    config.ollama.host,
                    config.ollama.port
                );
                println!("   Embedding model: {}", client.embedding_model());
                println!("   Generation model: {}", client.generation_model());
            }
            Err(e) => {
                println!("   {} Ollama: Unhealthy - {:#}", style("⚠").yellow(), e);
            }
        },
        Err(e) => {
            println!("   {} Ollama: Invalid configuration - {:#}", style("✗").red(), e);
        }
    }

    println!();
    println!("{}", style("Dataset:").bold().yellow());
    let dataset_path = config.dataset_path();
    let corpus_size = match load_samples(&dataset_path) {
        Ok(samples) => {
            println!("   Samples: {} ({})", samples.len(), dataset_path.display());
            Some(samples.len())
        }
        Err(e) => {
            println!("   {} {}", style("✗").red(), e);
            None
        }
    };

    println!();
    println!("{}", style("Vector indexes:").bold().yellow());
    let db_path = config.vector_database_path();
    let model = &config.ollama.embedding_model;
    for (label, base) in [("Dataset", DATASET_TABLE), ("Knowledge", KNOWLEDGE_TABLE)] {
        let index = LanceIndex::new(&db_path, model_table(base, model));
        match index.count().await {
            Ok(count) => {
                let stale = label == "Dataset" && corpus_size.is_some_and(|n| n != count);
                if stale {
                    println!(
                        "   {}: {} entries {}",
                        label,
                        count,
                        style("(stale, rebuilt on next query)").yellow()
                    );
                } else {
                    println!("   {}: {} entries", label, count);
                }
            }
            Err(e) => {
                warn!("Failed to read {} index: {}", index.table_name(), e);
                println!("   {}: {} {}", label, style("unavailable").red(), e);
            }
        }
    }
    println!(
        "   Location: {} (model {})",
        style(db_path.display()).dim(),
        model
    );

    Ok(())
}

/// Print the effective configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Ollama Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => println!("  URL: {}", style(url).cyan()),
        Err(e) => println!("  URL: {} ({})", style("Invalid").red(), e),
    }
    println!("  Embedding model: {}", style(&config.ollama.embedding_model).cyan());
    println!("  Generation model: {}", style(&config.ollama.generation_model).cyan());
    println!("  Batch size: {}", style(config.ollama.batch_size).cyan());

    println!();
    println!("{}", style("Dataset Tier:").bold().yellow());
    println!("  Dataset: {}", style(config.dataset_path().display()).cyan());
    println!("  Threshold: {}", style(config.similarity.threshold).cyan());
    println!("  Top-k: {}", style(config.similarity.top_k).cyan());

    println!();
    println!("{}", style("Knowledge Tier:").bold().yellow());
    println!("  Knowledge: {}", style(config.knowledge_path().display()).cyan());
    println!("  Top-k: {}", style(config.rag.top_k).cyan());
    println!(
        "  Chunking: {} words, {} overlap",
        style(config.rag.chunk_size).cyan(),
        style(config.rag.chunk_overlap).cyan()
    );
    println!(
        "  Complex keywords: {}",
        style(config.rag.complex_keywords.join(", ")).cyan()
    );

    println!();
    println!("{}", style("Guardrails:").bold().yellow());
    println!("  Enabled: {}", style(config.guardrails.enabled).cyan());
    if !config.guardrails.disclaimer.is_empty() {
        println!("  Disclaimer: {}", style(&config.guardrails.disclaimer).cyan());
    }

    println!();
    println!("HTTP bind: {}", style(&config.server.bind).cyan());
    println!("Log level: {}", style(&config.logging.level).cyan());
    println!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Change one setting in `config.toml` under `config_dir`.
///
/// The file is re-read without environment overrides so only `key` changes
/// on disk.
#[inline]
pub fn set_config(config_dir: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_file(config_dir)?;
    config.set_value(key, value).with_context(|| {
        format!("Cannot set {} (settable keys: {})", key, SETTABLE_KEYS.join(", "))
    })?;
    config.save()?;

    println!(
        "{} {} = {} saved to {}",
        style("✓").green(),
        style(key).cyan(),
        style(value.trim()).cyan(),
        style(config.config_file_path().display()).dim()
    );
    Ok(())
}
