//! mistsim Core - Edge/Mist Orchestration Simulation
//!
//! Three tightly coupled engines:
//! 1. **Kernel**: a deterministic discrete-event queue ordered by `(time, sequence)`
//! 2. **Mobility**: per-node trajectories precomputed once, queried in O(1)
//! 3. **Clustering**: a weight-based protocol electing orchestrators into a forest
//!
//! plus the destination ranking policy that consumes the cluster forest.

pub mod cluster;
pub mod error;
pub mod kernel;
pub mod mobility;
pub mod node;
pub mod ranking;
pub mod task;
pub mod world;

// Re-export key types for convenience
pub use cluster::{
    BreakReason, ClusterAgent, ClusterParams, ClusterProtocol, ClusterRegistry, ClusterSnapshot,
    NodeState, UpdateOutcome, WeightBreakdown, WeightInputs, WeightPolicy,
};
pub use error::CoreError;
pub use kernel::{
    Dispatch, EmptyQueue, Entity, EntityContext, EntityId, EntityKey, Event, EventKernel, EventKey,
    EventKind, Payload, RunSummary, Simulation,
};
pub use mobility::{MapBounds, MobilityModel, MobilityParams, PathPlan, Trajectory, Waypoints};
pub use node::{ComputingNode, NodeTable};
pub use ranking::{
    ArchitectureFilter, DefaultPlacement, DestinationRanking, FallbackMode, PlacementContext,
    PlacementPolicy,
};
pub use task::{FailureReason, Task, TaskId, TaskStatus};
pub use world::{ClusterStats, World};
