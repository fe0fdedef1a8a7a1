//! Error types for the simulation core.

use crate::kernel::EntityKey;
use crate::task::TaskId;
use mistsim_env::NodeId;
use thiserror::Error;

/// Errors surfaced by the kernel, mobility, clustering and ranking engines.
///
/// Two variants are programming errors that abort a run
/// (`AlreadyGenerated`, `NonCausal`); `NoEligibleDestination` is a
/// task-level outcome the caller turns into a task failure reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// `generate_path` was called twice for the same node
    #[error("Trajectory for node {0} was already generated")]
    AlreadyGenerated(NodeId),

    /// An event was scheduled before the current simulated time
    #[error("Cannot schedule event at t={requested} before current time t={now}")]
    NonCausal { requested: f64, now: f64 },

    /// A node id is not part of the topology
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// An event targets an entity that was never registered
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityKey),

    /// Following parent links from a node did not reach a root
    #[error("Cluster forest broken at node {0}: parent chain does not terminate")]
    BrokenForest(NodeId),

    /// Destination ranking found no eligible node for a task
    #[error("No eligible destination for task {0}")]
    NoEligibleDestination(TaskId),
}

impl CoreError {
    /// Returns true for errors that indicate a bug in the caller.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyGenerated(_) | CoreError::NonCausal { .. } | CoreError::BrokenForest(_)
        )
    }
}
