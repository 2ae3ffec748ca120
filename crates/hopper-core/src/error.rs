//! Error types for Hopper

use thiserror::Error;

/// Main error type for Hopper
#[derive(Error, Debug)]
pub enum HopperError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(#[source] std::io::Error),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Protocol desync: no well-formed reply after {attempts} receives")]
    ProtocolDesync { attempts: u32 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Q-table error: {0}")]
    Table(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HopperError {
    /// Whether this error came out of the environment link.
    ///
    /// The episode runner turns every such error into a forced DEATH;
    /// anything else aborts the run.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HopperError::Connect(_)
                | HopperError::Transport(_)
                | HopperError::Closed
                | HopperError::Timeout(_)
                | HopperError::ProtocolDesync { .. }
                | HopperError::InvalidState(_)
                | HopperError::InvalidPayload(_)
        )
    }
}

/// Result type alias for Hopper operations
pub type Result<T> = std::result::Result<T, HopperError>;
