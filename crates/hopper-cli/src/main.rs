//! Hopper CLI - Train and evaluate a Q-learning agent against the platform environment
//!
//! The environment runs as a separate process and is reached over TCP.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hopper_core::util::load_env_file;

mod commands;
mod config;

use crate::config::{Config, LoggingConfig};

#[derive(Parser)]
#[command(name = "hopper")]
#[command(
    author,
    version,
    about = "Hopper - tabular Q-learning over a networked environment",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to HOPPER_CONFIG, ./hopper.toml, ~/.config/hopper/hopper.toml)
    #[arg(short, long, global = true, env = "HOPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Environment host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Environment port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the agent, then write the Q-table and route report
    Train {
        /// Number of training episodes
        #[arg(short, long)]
        episodes: Option<usize>,
    },

    /// Evaluate the saved Q-table greedily
    Eval {
        /// Number of test episodes
        #[arg(short, long)]
        episodes: Option<usize>,
    },

    /// Train, then evaluate on the same connection
    Run {
        /// Number of training episodes
        #[arg(long)]
        train_episodes: Option<usize>,

        /// Number of test episodes
        #[arg(long)]
        test_episodes: Option<usize>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(commands::config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from hopper.env file (before parsing args)
    load_env_file();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.link.host = host;
    }
    if let Some(port) = cli.port {
        config.link.port = port;
    }

    let _guard = init_logging(&config.logging, cli.verbose)?;
    match &config.source {
        Some(path) => tracing::info!("Loaded config from: {:?}", path),
        None => tracing::debug!("No config file found, using defaults and environment"),
    }

    match cli.command {
        Commands::Train { episodes } => {
            if let Some(n) = episodes {
                config.training.episodes = n;
            }
            commands::train::run(&config).await
        }
        Commands::Eval { episodes } => {
            if let Some(n) = episodes {
                config.evaluation.episodes = n;
            }
            commands::eval::run(&config).await
        }
        Commands::Run {
            train_episodes,
            test_episodes,
        } => {
            if let Some(n) = train_episodes {
                config.training.episodes = n;
            }
            if let Some(n) = test_episodes {
                config.evaluation.episodes = n;
            }
            commands::train::run_and_evaluate(&config).await
        }
        Commands::Config(cmd) => commands::config::run(cmd, &config).await,
    }
}

/// Install the tracing subscriber; the returned guard flushes the log file on drop
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("hopper={level},hopper_link={level},hopper_rl={level}").into());

    match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            std::fs::create_dir_all(dir)?;
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("hopper.log");

            let file_appender = tracing_appender::rolling::never(dir, filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Ok(None)
        }
    }
}
