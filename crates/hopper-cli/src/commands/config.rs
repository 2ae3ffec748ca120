//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write the default configuration to a file
    Init {
        /// Destination file
        #[arg(default_value = "hopper.toml")]
        path: std::path::PathBuf,
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config).await,
        ConfigCommands::Init { path, force } => init(&path, force).await,
    }
}

async fn show(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(path, toml::to_string_pretty(&Config::default())?)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}
