//! Weight-based clustering of mist devices.
//!
//! Every device periodically computes a weight from its capacity, current
//! and predicted neighbors, spread and battery. Devices attach to the
//! heaviest reachable cluster, forming a forest whose roots are the
//! orchestrators.

mod agent;
mod protocol;
mod registry;
mod snapshot;
mod weight;

pub use agent::ClusterAgent;
pub use protocol::{BreakReason, ClusterParams, ClusterProtocol, UpdateOutcome};
pub use registry::ClusterRegistry;
pub use snapshot::{ClusterSnapshot, NodeState};
pub use weight::{WeightBreakdown, WeightInputs, WeightPolicy};
