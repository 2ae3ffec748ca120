//! Episode state machine

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use hopper_core::{Environment, Result, State, Transition};

use crate::agent::Policy;
use crate::experience::Experience;

/// Reward values the environment uses to signal the end of an episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalRewards {
    pub success: f64,
    pub death: f64,
}

impl Default for TerminalRewards {
    fn default() -> Self {
        Self {
            success: 300.0,
            death: -100.0,
        }
    }
}

impl TerminalRewards {
    /// Classify a step, in priority order: success, death, timeout.
    ///
    /// `steps` counts the steps taken so far, including the one being classified.
    pub fn classify(&self, reward: f64, steps: usize, step_budget: usize) -> EpisodeStatus {
        if reward == self.success {
            EpisodeStatus::Success
        } else if reward == self.death {
            EpisodeStatus::Death
        } else if steps >= step_budget {
            EpisodeStatus::Timeout
        } else {
            EpisodeStatus::Running
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpisodeStatus {
    Running,
    Success,
    Death,
    Timeout,
}

impl EpisodeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EpisodeStatus::Running)
    }
}

/// How a finished episode went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    /// 1-based episode number within its run
    pub episode: usize,
    pub steps: usize,
    pub status: EpisodeStatus,
    /// "P<platform> <Direction> -> <action>" per step
    pub route: Vec<String>,
}

/// Drives one episode at a time against an environment
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRunner {
    rewards: TerminalRewards,
    step_budget: usize,
}

impl EpisodeRunner {
    pub fn new(rewards: TerminalRewards, step_budget: usize) -> Self {
        Self {
            rewards,
            step_budget,
        }
    }

    /// Run one episode from the start state until it reaches a terminal status.
    ///
    /// A failed step ends the episode as a DEATH with the death reward and the
    /// start state; the policy still observes that transition. Errors that
    /// leave the environment unusable are returned instead.
    pub async fn run<E, P>(
        &self,
        env: &mut E,
        policy: &mut P,
        episode: usize,
    ) -> Result<EpisodeOutcome>
    where
        E: Environment + ?Sized,
        P: Policy + ?Sized,
    {
        let mut state = State::START;
        let mut route = Vec::new();
        let mut steps = 0;

        loop {
            let action = policy.select_action(state);
            route.push(format!("{state} -> {action}"));
            steps += 1;

            let (transition, status) = match env.step(action).await {
                Ok(t) => (t, self.rewards.classify(t.reward, steps, self.step_budget)),
                Err(e) if e.is_transport() => {
                    warn!(episode, steps, "Step failed, counting as death: {}", e);
                    (
                        Transition::new(State::START, self.rewards.death),
                        EpisodeStatus::Death,
                    )
                }
                Err(e) => return Err(e),
            };
            trace!(
                episode,
                steps,
                reward = transition.reward,
                "{} -> {} => {:?}",
                state,
                action,
                status
            );

            policy.observe(&Experience::new(
                state,
                action,
                transition.reward,
                transition.next_state,
                status.is_terminal(),
            ));

            if status.is_terminal() {
                return Ok(EpisodeOutcome {
                    episode,
                    steps,
                    status,
                    route,
                });
            }
            state = transition.next_state;
        }
    }
}
