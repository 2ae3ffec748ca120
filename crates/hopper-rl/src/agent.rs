//! Epsilon-greedy Q-learning agent

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hopper_core::{Action, HopperError, Result, State, NUM_ACTIONS};

use crate::experience::Experience;
use crate::table::{QTable, DEFAULT_Q_VALUE};

/// Something that picks actions and may learn from what it observes
pub trait Policy {
    fn select_action(&mut self, state: State) -> Action;

    /// Learn from one observed transition
    fn observe(&mut self, experience: &Experience);
}

/// Learning hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Learning rate
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Starting exploration rate
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub epsilon_floor: f64,
    pub initial_q: f64,
    /// Seed for exploration; entropy when unset
    pub seed: Option<u64>,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.97,
            epsilon: 0.9,
            epsilon_decay: 0.995,
            epsilon_floor: 0.01,
            initial_q: DEFAULT_Q_VALUE,
            seed: None,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(HopperError::Config(what.to_string()))
            }
        };
        check(self.alpha > 0.0 && self.alpha <= 1.0, "alpha must be in (0, 1]")?;
        check((0.0..=1.0).contains(&self.gamma), "gamma must be in [0, 1]")?;
        check((0.0..=1.0).contains(&self.epsilon), "epsilon must be in [0, 1]")?;
        check(
            self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0,
            "epsilon_decay must be in (0, 1]",
        )?;
        check(
            (0.0..=self.epsilon).contains(&self.epsilon_floor),
            "epsilon_floor must be in [0, epsilon]",
        )?;
        check(self.initial_q.is_finite(), "initial_q must be finite")
    }
}

/// Tabular Q-learning agent. Owns its table exclusively.
pub struct Agent {
    table: QTable,
    params: Hyperparameters,
    epsilon: f64,
    rng: StdRng,
}

impl Agent {
    pub fn new(table: QTable, params: Hyperparameters) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table,
            epsilon: params.epsilon,
            params,
            rng,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Explore with probability epsilon, otherwise exploit
    pub fn choose_action(&mut self, state: State) -> Action {
        if self.epsilon > 0.0 && self.rng.gen::<f64>() < self.epsilon {
            Action::ALL[self.rng.gen_range(0..NUM_ACTIONS)]
        } else {
            self.table.best_action(state)
        }
    }

    /// Apply the Q-learning rule for one transition. Returns the TD error.
    pub fn update(&mut self, experience: &Experience) -> f64 {
        self.table.update(experience, self.params.alpha, self.params.gamma)
    }

    /// Once per completed episode
    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.epsilon_floor);
    }

    /// Pure exploitation until the returned guard is dropped
    pub fn force_greedy(&mut self) -> GreedyPolicy<'_> {
        let saved_epsilon = self.epsilon;
        self.epsilon = 0.0;
        debug!("Epsilon forced to 0 (was {:.4})", saved_epsilon);
        GreedyPolicy {
            agent: self,
            saved_epsilon,
        }
    }
}

impl Policy for Agent {
    fn select_action(&mut self, state: State) -> Action {
        self.choose_action(state)
    }

    fn observe(&mut self, experience: &Experience) {
        self.update(experience);
    }
}

/// Read-only greedy view of an agent; restores epsilon on drop
pub struct GreedyPolicy<'a> {
    agent: &'a mut Agent,
    saved_epsilon: f64,
}

impl GreedyPolicy<'_> {
    pub fn table(&self) -> &QTable {
        self.agent.table()
    }
}

impl Policy for GreedyPolicy<'_> {
    fn select_action(&mut self, state: State) -> Action {
        self.agent.table.best_action(state)
    }

    fn observe(&mut self, _experience: &Experience) {}
}

impl Drop for GreedyPolicy<'_> {
    fn drop(&mut self) {
        self.agent.epsilon = self.saved_epsilon;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopper_core::NUM_STATES;

    fn seeded(epsilon: f64) -> Agent {
        let params = Hyperparameters {
            epsilon,
            seed: Some(7),
            ..Hyperparameters::default()
        };
        Agent::new(QTable::new(NUM_STATES, DEFAULT_Q_VALUE), params)
    }

    #[test]
    fn test_default_hyperparameters_validate() {
        assert!(Hyperparameters::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let bad = [
            Hyperparameters {
                alpha: 0.0,
                ..Default::default()
            },
            Hyperparameters {
                gamma: 1.5,
                ..Default::default()
            },
            Hyperparameters {
                epsilon: -0.1,
                ..Default::default()
            },
            Hyperparameters {
                epsilon_decay: 0.0,
                ..Default::default()
            },
            Hyperparameters {
                epsilon_floor: 0.95,
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(matches!(params.validate(), Err(HopperError::Config(_))));
        }
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let mut agent = seeded(0.0);
        for _ in 0..50 {
            assert_eq!(agent.choose_action(State::START), Action::Left);
        }
    }

    #[test]
    fn test_full_epsilon_explores_every_action() {
        let mut agent = seeded(1.0);
        let mut seen = [false; NUM_ACTIONS];
        for _ in 0..200 {
            seen[agent.choose_action(State::START).to_index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_epsilon_decay_is_monotone_and_floored() {
        let mut agent = seeded(0.9);
        let mut previous = agent.epsilon();
        for _ in 0..2000 {
            agent.decay_epsilon();
            let current = agent.epsilon();
            assert!(current <= previous);
            assert!(current >= 0.01);
            previous = current;
        }
        assert_eq!(agent.epsilon(), 0.01);
    }

    #[test]
    fn test_force_greedy_restores_epsilon() {
        let mut agent = seeded(0.42);
        {
            let mut greedy = agent.force_greedy();
            assert_eq!(greedy.select_action(State::START), Action::Left);
            greedy.observe(&Experience::new(
                State::START,
                Action::Left,
                300.0,
                State::START,
                true,
            ));
            assert_eq!(greedy.table().get(State::START, Action::Left), 0.1);
        }
        assert_eq!(agent.epsilon(), 0.42);
    }

    #[test]
    fn test_observe_updates_table() {
        let mut agent = seeded(0.0);
        let exp = Experience::new(State::START, Action::Jump, 300.0, State::START, true);
        agent.observe(&exp);
        assert!((agent.table().get(State::START, Action::Jump) - 30.09).abs() < 1e-9);
        assert_eq!(agent.choose_action(State::START), Action::Jump);
    }
}
