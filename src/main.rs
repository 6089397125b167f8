use banking_assist::{AssistError, Result};
use banking_assist::commands::{
    ask, build_index, chat, ingest, set_config, show_config, show_status, validate_dataset,
};
use banking_assist::config::Config;
use banking_assist::dataset::DEFAULT_MIN_SAMPLES;
use banking_assist::server::serve;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "banking-assist")]
#[command(about = "Tiered banking customer-support assistant backed by a local model server")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.banking-assist)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The customer question
        query: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop; 'quit' to exit
    Chat,
    /// Build or validate the curated-answer index
    BuildIndex,
    /// Chunk and embed the knowledge base
    Ingest {
        /// Directory of markdown documents (defaults to the configured knowledge path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Validate the curated dataset
    ValidateDataset {
        /// Dataset file (defaults to the configured dataset path)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Minimum number of samples required
        #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
        min_samples: usize,
    },
    /// Show index sizes and model server health
    Status,
    /// Serve POST /query and GET /health over HTTP
    Serve {
        /// Listen address (defaults to the configured server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (default)
    Show,
    /// Set one value in config.toml, e.g. `config set ollama.port 11435`
    Set {
        /// Dotted key such as `similarity.threshold`
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_config_dir()
            .map_err(|e| AssistError::Config(e.to_string()))?,
    };
    let mut config = Config::load(&config_dir)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for ignored in &config.ignored_overrides {
        warn!("{}", ignored);
    }

    match cli.command {
        Commands::Ask { query, json } => {
            ask(&config, &query, json).await?;
        }
        Commands::Chat => {
            chat(&config).await?;
        }
        Commands::BuildIndex => {
            build_index(&config).await?;
        }
        Commands::Ingest { path } => {
            ingest(&config, path).await?;
        }
        Commands::ValidateDataset { path, min_samples } => {
            validate_dataset(&config, path.as_deref(), min_samples)?;
        }
        Commands::Status => {
            show_status(&config).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config
                    .set_value("server.bind", &bind)
                    .map_err(|e| AssistError::Config(e.to_string()))?;
            }
            serve(&config).await?;
        }
        Commands::Config {
            action: None | Some(ConfigAction::Show),
        } => {
            show_config(&config)?;
        }
        Commands::Config {
            action: Some(ConfigAction::Set { key, value }),
        } => {
            set_config(&config_dir, &key, &value)?;
        }
    }

    Ok(())
}
