//! Observed transitions

use serde::{Deserialize, Serialize};

use hopper_core::{Action, State};

/// A single experience tuple (s, a, r, s', done)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: State,
    pub action: Action,
    pub reward: f64,
    pub next_state: State,
    pub done: bool,
}

impl Experience {
    /// Create a new experience
    pub fn new(state: State, action: Action, reward: f64, next_state: State, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}
