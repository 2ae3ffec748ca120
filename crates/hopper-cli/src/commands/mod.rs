//! CLI command modules

pub mod config;
pub mod eval;
pub mod train;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use hopper_link::EnvLink;
use hopper_rl::{Agent, EvaluationSummary, QTable, TrainingSummary};

use crate::config::Config;

/// Everything a run needs: a live link and an agent warm-started from disk
pub struct Session {
    pub link: EnvLink,
    pub agent: Agent,
}

impl Session {
    pub async fn open(config: &Config) -> Result<Self> {
        let table = QTable::load_or_default(
            &config.output.q_table,
            config.link.num_states,
            config.learning.initial_q,
        );
        let agent = Agent::new(table, config.learning.clone());

        let endpoint = config.link.endpoint();
        let link = EnvLink::connect(config.link.clone())
            .await
            .with_context(|| format!("Failed to connect to environment at {endpoint}"))?;

        Ok(Self { link, agent })
    }
}

/// What ends up in the optional JSON summary
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSummary>,
}

impl RunSummary {
    pub fn write(&self, config: &Config) -> Result<()> {
        let Some(path) = &config.output.summary else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {path:?}"))?;
        info!("Run summary written to {:?}", path);
        Ok(())
    }
}
