//! Dense tabular Q-values with a markdown snapshot format
//!
//! The snapshot is a two-line table header followed by one row per state:
//!
//! ```text
//! | State | Left | Right | Jump | Platform | Direction |
//! |-------|------|-------|------|----------|-----------|
//! |  0 |    0.100000 |    0.100000 |    0.100000 |  0 | North |
//! ```
//!
//! Rows of three whitespace-separated numbers are accepted on load as well.

use std::fmt::Write as _;
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use tracing::{debug, info, warn};

use hopper_core::{Action, HopperError, Result, State, NUM_ACTIONS};

use crate::experience::Experience;

/// Optimistic value for every cell of a fresh table
pub const DEFAULT_Q_VALUE: f64 = 0.1;

const HEADER: &str = "| State | Left | Right | Jump | Platform | Direction |";
const SEPARATOR: &str = "|-------|------|-------|------|----------|-----------|";
const HEADER_LINES: usize = 2;

/// Q-value table indexed by (state, action)
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Array2<f64>,
}

impl QTable {
    /// A table with every cell set to `initial`
    pub fn new(num_states: usize, initial: f64) -> Self {
        Self {
            values: Array2::from_elem((num_states, NUM_ACTIONS), initial),
        }
    }

    pub fn num_states(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, state: State, action: Action) -> f64 {
        self.values[[state.index(), action.to_index()]]
    }

    pub fn row(&self, state: State) -> ArrayView1<'_, f64> {
        self.values.row(state.index())
    }

    /// Greedy action; ties go to the lowest index
    pub fn best_action(&self, state: State) -> Action {
        let mut best = 0;
        let row = self.row(state);
        for (i, value) in row.iter().enumerate().skip(1) {
            if *value > row[best] {
                best = i;
            }
        }
        Action::ALL[best]
    }

    pub fn max_value(&self, state: State) -> f64 {
        self.row(state)[self.best_action(state).to_index()]
    }

    /// One-step Q-learning update of a single cell. Returns the TD error.
    pub fn update(&mut self, exp: &Experience, alpha: f64, gamma: f64) -> f64 {
        let future = if exp.done {
            0.0
        } else {
            self.max_value(exp.next_state)
        };
        let target = exp.reward + gamma * future;
        let cell = &mut self.values[[exp.state.index(), exp.action.to_index()]];
        let td_error = target - *cell;
        *cell += alpha * td_error;
        td_error
    }

    /// Load a snapshot, falling back to a fresh table on any problem
    pub fn load_or_default(path: &Path, num_states: usize, initial: f64) -> Self {
        if !path.exists() {
            debug!("No Q-table at {:?}, starting fresh", path);
            return Self::new(num_states, initial);
        }
        match Self::load(path, num_states) {
            Ok(table) => {
                info!("Warm-starting from Q-table {:?}", path);
                table
            }
            Err(e) => {
                warn!("Ignoring Q-table {:?}: {}", path, e);
                Self::new(num_states, initial)
            }
        }
    }

    pub fn load(path: &Path, num_states: usize) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, num_states)
    }

    /// Parse a snapshot; the shape must be exactly `num_states` x 3
    pub fn parse(text: &str, num_states: usize) -> Result<Self> {
        let mut cells = Vec::with_capacity(num_states * NUM_ACTIONS);
        let mut rows = 0;

        for (lineno, line) in text.lines().enumerate().skip(HEADER_LINES) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = parse_row(line).ok_or_else(|| {
                HopperError::Table(format!("malformed row on line {}", lineno + 1))
            })?;
            cells.extend_from_slice(&row);
            rows += 1;
        }

        if rows != num_states {
            return Err(HopperError::Table(format!(
                "expected {num_states} rows, found {rows}"
            )));
        }

        let values = Array2::from_shape_vec((num_states, NUM_ACTIONS), cells)
            .map_err(|e| HopperError::Table(e.to_string()))?;
        Ok(Self { values })
    }

    /// Render the snapshot
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{HEADER}");
        let _ = writeln!(out, "{SEPARATOR}");
        for (index, row) in self.values.outer_iter().enumerate() {
            let state = State::new(index, self.num_states()).unwrap_or(State::START);
            let _ = writeln!(
                out,
                "| {:2} | {:>11.6} | {:>11.6} | {:>11.6} | {:2} | {} |",
                index,
                row[0],
                row[1],
                row[2],
                state.platform(),
                state.direction()
            );
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())?;
        info!("Q-table written to {:?}", path);
        Ok(())
    }
}

/// Extract the three action values from a snapshot line; every value must be finite
fn parse_row(line: &str) -> Option<[f64; NUM_ACTIONS]> {
    let numbers: Vec<&str> = if line.starts_with('|') {
        // | state | left | right | jump | ...
        line.split('|')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .skip(1)
            .take(NUM_ACTIONS)
            .collect()
    } else {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != NUM_ACTIONS {
            return None;
        }
        fields
    };

    if numbers.len() != NUM_ACTIONS {
        return None;
    }
    let mut row = [0.0; NUM_ACTIONS];
    for (slot, text) in row.iter_mut().zip(numbers) {
        *slot = text.parse::<f64>().ok().filter(|v| v.is_finite())?;
    }
    Some(row)
}
