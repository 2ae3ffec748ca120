//! State and Action types for the platform environment

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HopperError, Result};

/// Number of discretized states the environment reports
pub const NUM_STATES: usize = 96;

/// Number of control actions
pub const NUM_ACTIONS: usize = 3;

/// Discretized agent position: platform index in the high bits, facing in the low two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State(usize);

impl State {
    /// The state every episode starts from
    pub const START: State = State(0);

    /// Validate a raw state value against the state space
    pub fn new(value: usize, num_states: usize) -> Result<Self> {
        if value < num_states {
            Ok(Self(value))
        } else {
            Err(HopperError::InvalidState(format!(
                "{value} is outside [0, {num_states})"
            )))
        }
    }

    /// Parse the environment's bit-string encoding (an optional `0b` prefix is accepted)
    pub fn from_bits(bits: &str, num_states: usize) -> Result<Self> {
        let trimmed = bits.trim();
        let digits = trimmed
            .strip_prefix("0b")
            .or_else(|| trimmed.strip_prefix("0B"))
            .unwrap_or(trimmed);
        let digits: String = digits.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(HopperError::InvalidState(format!(
                "empty bit-string {bits:?}"
            )));
        }
        let value = usize::from_str_radix(&digits, 2)
            .map_err(|e| HopperError::InvalidState(format!("{bits:?}: {e}")))?;
        Self::new(value, num_states)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn platform(self) -> usize {
        self.0 >> 2
    }

    pub fn direction(self) -> Direction {
        Direction::from_bits(self.0 & 0b11)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{} {}", self.platform(), self.direction())
    }
}

/// Compass facing encoded in the two low bits of a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    fn from_bits(bits: usize) -> Self {
        match bits & 0b11 {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }

    pub fn to_bits(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control command sent to the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Left,
    Right,
    Jump,
}

impl Action {
    /// All actions in canonical index order
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Left, Action::Right, Action::Jump];

    pub fn to_index(self) -> usize {
        match self {
            Action::Left => 0,
            Action::Right => 1,
            Action::Jump => 2,
        }
    }

    /// Wire label sent to the environment
    pub fn label(self) -> &'static str {
        match self {
            Action::Left => "left",
            Action::Right => "right",
            Action::Jump => "jump",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
