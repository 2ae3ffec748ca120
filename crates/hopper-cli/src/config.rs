//! Configuration loading for the Hopper CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use hopper_link::LinkConfig;
use hopper_rl::{EvaluationConfig, Hyperparameters, TerminalRewards, TrainingConfig};

/// Full run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub learning: Hyperparameters,
    pub training: TrainingConfig,
    pub evaluation: EvaluationConfig,
    pub rewards: TerminalRewards,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Q-table snapshot, read for warm start and written after training
    pub q_table: PathBuf,
    /// Successful route report
    pub routes: PathBuf,
    /// Optional JSON summary of the run
    pub summary: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            q_table: PathBuf::from("q-table.md"),
            routes: PathBuf::from("route.md"),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Also log to this file when set
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = explicit
            .map(Path::to_path_buf)
            .or_else(Self::find_config_file);

        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = &config_path {
            builder = builder.add_source(File::from(path.clone()).required(explicit.is_some()));
        }

        // Environment variables with HOPPER__ prefix, e.g. HOPPER__LINK__PORT=2038
        builder = builder.add_source(
            Environment::with_prefix("HOPPER")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.source = config_path.filter(|p| p.exists());
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        self.learning.validate()?;
        anyhow::ensure!(self.training.step_budget > 0, "training.step_budget must be positive");
        anyhow::ensure!(self.evaluation.step_budget > 0, "evaluation.step_budget must be positive");
        anyhow::ensure!(self.link.num_states > 0, "link.num_states must be positive");
        anyhow::ensure!(
            self.link.max_message_bytes > 0,
            "link.max_message_bytes must be positive"
        );
        anyhow::ensure!(
            self.rewards.success != self.rewards.death,
            "rewards.success and rewards.death must differ"
        );
        Ok(())
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: HOPPER_CONFIG env, ./hopper.toml, ~/.config/hopper/hopper.toml
        if let Ok(path) = std::env::var("HOPPER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("hopper.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("hopper").join("hopper.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Loading reads process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn load(path: &Path) -> Result<Config> {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        Config::load(Some(path))
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = Config::default();
        assert_eq!(config.link.port, 2037);
        assert_eq!(config.learning.alpha, 0.1);
        assert_eq!(config.learning.gamma, 0.97);
        assert_eq!(config.learning.epsilon, 0.9);
        assert_eq!(config.learning.epsilon_decay, 0.995);
        assert_eq!(config.training.episodes, 10_000);
        assert_eq!(config.evaluation.episodes, 20);
        assert_eq!(config.rewards.success, 300.0);
        assert_eq!(config.rewards.death, -100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hopper.toml");
        std::fs::write(
            &path,
            r#"
[link]
port = 4000
max_parse_attempts = 5

[learning]
alpha = 0.2
seed = 11

[training]
episodes = 250

[output]
summary = "summary.json"
"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.link.port, 4000);
        assert_eq!(config.link.max_parse_attempts, 5);
        assert_eq!(config.link.host, "127.0.0.1");
        assert_eq!(config.learning.alpha, 0.2);
        assert_eq!(config.learning.seed, Some(11));
        assert_eq!(config.training.episodes, 250);
        assert_eq!(config.training.step_budget, 500);
        assert_eq!(config.output.summary, Some(PathBuf::from("summary.json")));
    }

    #[test]
    fn test_invalid_learning_rate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[learning]\nalpha = 2.0\n").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hopper.toml");
        std::fs::write(&path, "[link]\nport = 4000\nhost = \"10.0.0.2\"\n").unwrap();

        let config = {
            let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            // Single underscore after the prefix is not part of the scheme
            std::env::set_var("HOPPER_LINK__HOST", "ignored");
            std::env::set_var("HOPPER__LINK__PORT", "4002");
            std::env::set_var("HOPPER__TRAINING__EPISODES", "12");
            let config = Config::load(Some(&path));
            std::env::remove_var("HOPPER_LINK__HOST");
            std::env::remove_var("HOPPER__LINK__PORT");
            std::env::remove_var("HOPPER__TRAINING__EPISODES");
            config
        };

        let config = config.unwrap();
        assert_eq!(config.link.port, 4002);
        assert_eq!(config.link.host, "10.0.0.2");
        assert_eq!(config.training.episodes, 12);
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_serializes_to_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[link]"));
        assert!(text.contains("port = 2037"));
    }
}
