//! Training and evaluation runs

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hopper_core::{Environment, HopperError, Result};

use crate::agent::Agent;
use crate::episode::{EpisodeOutcome, EpisodeRunner, EpisodeStatus, TerminalRewards};

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub step_budget: usize,
    /// Log windowed progress every this many episodes; 0 disables
    pub progress_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            step_budget: 500,
            progress_interval: 100,
        }
    }
}

/// Evaluation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub episodes: usize,
    pub step_budget: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            episodes: 20,
            step_budget: 300,
        }
    }
}

/// SUCCESS / DEATH / TIMEOUT counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub successes: usize,
    pub deaths: usize,
    pub timeouts: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, status: EpisodeStatus) {
        match status {
            EpisodeStatus::Success => self.successes += 1,
            EpisodeStatus::Death => self.deaths += 1,
            EpisodeStatus::Timeout => self.timeouts += 1,
            EpisodeStatus::Running => {}
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.deaths + self.timeouts
    }

    /// Fraction of episodes that succeeded; 0 for an empty run
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.successes as f64 / n as f64,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub counts: OutcomeCounts,
    pub success_rate: f64,
    pub final_epsilon: f64,
    /// Successful episodes only, in run order
    pub routes: Vec<EpisodeOutcome>,
}

/// Result of an evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub episodes: usize,
    pub counts: OutcomeCounts,
    pub success_rate: f64,
}

fn check_budget(step_budget: usize) -> Result<()> {
    if step_budget == 0 {
        return Err(HopperError::Config("step_budget must be positive".to_string()));
    }
    Ok(())
}

/// Runs training episodes with learning enabled
pub struct Trainer {
    config: TrainingConfig,
    runner: EpisodeRunner,
}

impl Trainer {
    pub fn new(config: TrainingConfig, rewards: TerminalRewards) -> Result<Self> {
        check_budget(config.step_budget)?;
        let runner = EpisodeRunner::new(rewards, config.step_budget);
        Ok(Self { config, runner })
    }

    /// Train until the configured episode count; stops early only if the
    /// environment becomes unusable.
    pub async fn train<E>(&self, env: &mut E, agent: &mut Agent) -> Result<TrainingSummary>
    where
        E: Environment + ?Sized,
    {
        let episodes = self.config.episodes;
        info!(
            "Training for {} episodes (step budget {})",
            episodes, self.config.step_budget
        );

        let mut counts = OutcomeCounts::default();
        let mut routes = Vec::new();
        let mut window_successes = 0;

        for episode in 1..=episodes {
            let outcome = self.runner.run(env, agent, episode).await?;
            agent.decay_epsilon();

            counts.record(outcome.status);
            debug!(
                episode,
                steps = outcome.steps,
                status = ?outcome.status,
                epsilon = agent.epsilon(),
                "Episode finished"
            );

            if outcome.status == EpisodeStatus::Success {
                window_successes += 1;
                routes.push(outcome);
            }

            let interval = self.config.progress_interval;
            if interval > 0 && episode % interval == 0 {
                info!(
                    "Episode {:5} | successes in last {}: {:3} | epsilon: {:.3}",
                    episode,
                    interval,
                    window_successes,
                    agent.epsilon()
                );
                window_successes = 0;
            }
        }

        let summary = TrainingSummary {
            episodes,
            counts,
            success_rate: counts.success_rate(),
            final_epsilon: agent.epsilon(),
            routes,
        };
        info!(
            "Training result: {}/{} successes ({:.2}%), {} deaths, {} timeouts",
            counts.successes,
            episodes,
            summary.success_rate * 100.0,
            counts.deaths,
            counts.timeouts
        );
        Ok(summary)
    }
}

/// Runs greedy episodes without touching the Q-table
pub struct Evaluator {
    config: EvaluationConfig,
    runner: EpisodeRunner,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig, rewards: TerminalRewards) -> Result<Self> {
        check_budget(config.step_budget)?;
        let runner = EpisodeRunner::new(rewards, config.step_budget);
        Ok(Self { config, runner })
    }

    pub async fn evaluate<E>(&self, env: &mut E, agent: &mut Agent) -> Result<EvaluationSummary>
    where
        E: Environment + ?Sized,
    {
        let episodes = self.config.episodes;
        info!("Evaluating greedy policy over {} episodes", episodes);

        let mut counts = OutcomeCounts::default();
        let mut greedy = agent.force_greedy();
        for episode in 1..=episodes {
            let outcome = self.runner.run(env, &mut greedy, episode).await?;
            debug!(
                episode,
                steps = outcome.steps,
                status = ?outcome.status,
                "Test episode finished"
            );
            counts.record(outcome.status);
        }
        drop(greedy);

        let summary = EvaluationSummary {
            episodes,
            counts,
            success_rate: counts.success_rate(),
        };
        info!(
            "Test result: {}/{} successes ({:.2}%)",
            counts.successes,
            episodes,
            summary.success_rate * 100.0
        );
        Ok(summary)
    }
}
