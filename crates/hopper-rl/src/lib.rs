//! Hopper RL - Tabular Q-learning for the platform environment
//!
//! This crate provides the Q-value table, the epsilon-greedy agent, the
//! episode state machine, and the training/evaluation runs built on them.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod episode;
pub mod experience;
pub mod orchestrator;
pub mod report;
pub mod table;

pub use agent::{Agent, GreedyPolicy, Hyperparameters, Policy};
pub use episode::{EpisodeOutcome, EpisodeRunner, EpisodeStatus, TerminalRewards};
pub use experience::Experience;
pub use orchestrator::{
    EvaluationConfig, EvaluationSummary, Evaluator, OutcomeCounts, Trainer, TrainingConfig,
    TrainingSummary,
};
pub use table::{QTable, DEFAULT_Q_VALUE};
