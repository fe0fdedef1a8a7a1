//! Harness error type.

use mistsim_core::CoreError;
use mistsim_env::EnvError;
use thiserror::Error;

/// Anything that can stop a scenario from producing a result.
#[derive(Debug, Error)]
pub enum SimError {
    /// Bad configuration or scenario name
    #[error(transparent)]
    Env(#[from] EnvError),

    /// The simulation itself failed
    #[error("simulation error: {0}")]
    Core(#[from] CoreError),

    /// JSON encoding of an export failed
    #[error("export encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Env(EnvError::Io(e))
    }
}
