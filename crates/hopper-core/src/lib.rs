//! Hopper Core - Core types, traits, and shared functionality
//!
//! This crate provides the foundational types used across all Hopper components:
//! the discretized state, the action set, and the environment seam.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod environment;
pub mod error;
pub mod state;
pub mod util;

pub use environment::{Environment, Transition};
pub use error::{HopperError, Result};
pub use state::{Action, Direction, State, NUM_ACTIONS, NUM_STATES};
