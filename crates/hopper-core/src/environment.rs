//! The seam between the learning engine and whatever answers its actions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{Action, State};

/// What the environment reports after one action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub next_state: State,
    pub reward: f64,
}

impl Transition {
    pub fn new(next_state: State, reward: f64) -> Self {
        Self { next_state, reward }
    }
}

/// An environment driven one blocking round trip at a time.
///
/// Implementations must return only once a well-formed reply is available
/// or the transport has failed.
#[async_trait]
pub trait Environment: Send {
    async fn step(&mut self, action: Action) -> Result<Transition>;
}
