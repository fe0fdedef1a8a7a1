//! Error types for the mistsim environment boundary.

use thiserror::Error;

/// Errors raised while validating the inputs the simulator is fed with.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A configuration value is out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A scenario name did not match any known scenario
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Reading or writing an artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Creates an invalid-configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
