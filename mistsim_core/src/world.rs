//! Shared simulation state handed to every entity.

use mistsim_env::NodeId;
use serde::Serialize;
use tracing::info;

use crate::cluster::{BreakReason, ClusterProtocol, ClusterRegistry, ClusterSnapshot, UpdateOutcome};
use crate::error::CoreError;
use crate::node::NodeTable;
use crate::ranking::{ArchitectureFilter, DefaultPlacement, DestinationRanking, PlacementContext};
use crate::task::Task;

/// Running counters of the clustering protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClusterStats {
    pub updates: u64,
    pub parent_changes: u64,
    pub joins: u64,
    pub outweighed: u64,
    pub broken_links: u64,
}

impl ClusterStats {
    pub fn record(&mut self, outcome: &UpdateOutcome) {
        self.updates += 1;
        if outcome.parent_changed() {
            self.parent_changes += 1;
        }
        if outcome.joined.is_some() {
            self.joins += 1;
        }
        match outcome.broke_away {
            Some(BreakReason::Outweighed) => self.outweighed += 1,
            Some(BreakReason::BrokenLink) => self.broken_links += 1,
            None => {}
        }
    }
}

/// Everything entities read and write during a run.
#[derive(Debug, Clone)]
pub struct World {
    pub nodes: NodeTable,

    /// Parent links of every mist device.
    pub clusters: ClusterRegistry,

    pub protocol: ClusterProtocol,

    pub ranking: DestinationRanking,

    pub placement: DefaultPlacement,

    /// Simulation horizon in seconds.
    pub duration: f64,

    pub stats: ClusterStats,

    pub snapshots: Vec<ClusterSnapshot>,

    /// Tasks that went through placement, in request order.
    pub tasks: Vec<Task>,
}

impl World {
    /// Builds the world; every edge device starts as its own orchestrator.
    pub fn new(nodes: NodeTable, protocol: ClusterProtocol, duration: f64) -> Self {
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        info!(
            "world: {} nodes, {} clustering devices, horizon {} s",
            nodes.len(),
            clusters.len(),
            duration
        );
        Self {
            nodes,
            clusters,
            protocol,
            ranking: DestinationRanking::default(),
            placement: DefaultPlacement::default(),
            duration,
            stats: ClusterStats::default(),
            snapshots: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_ranking(mut self, ranking: DestinationRanking) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_placement(mut self, placement: DefaultPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn orchestrator_of(&self, node: NodeId) -> Result<NodeId, CoreError> {
        self.clusters.orchestrator_of(node)
    }

    pub fn cluster_members_of(&self, node: NodeId) -> Result<Vec<NodeId>, CoreError> {
        self.clusters.cluster_members_of(node)
    }

    pub fn placement_context(&self, time: f64) -> PlacementContext<'_> {
        PlacementContext {
            nodes: &self.nodes,
            clusters: &self.clusters,
            time,
        }
    }

    /// Ranks every node for `task` at `time`.
    pub fn select_destination(
        &self,
        task: &Task,
        filter: ArchitectureFilter,
        time: f64,
    ) -> Result<NodeId, CoreError> {
        self.ranking.select(
            &self.placement_context(time),
            self.nodes.iter(),
            task,
            filter,
            &self.placement,
        )
    }

    /// Records the current forest and returns a copy of it.
    pub fn capture_snapshot(&mut self, time: f64) -> Result<ClusterSnapshot, CoreError> {
        let snapshot = ClusterSnapshot::capture(&self.nodes, &self.clusters, time)?;
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterParams;
    use crate::node::ComputingNode;
    use crate::task::TaskId;
    use mistsim_env::{Location, NodeKind};

    fn world() -> World {
        let mut nodes = NodeTable::new();
        nodes
            .push(ComputingNode::new(NodeId(0), NodeKind::Cloud, "cloud", Location::ORIGIN).with_compute(8, 40_000.0))
            .unwrap();
        for (i, x) in [0.0, 5.0].iter().enumerate() {
            let id = NodeId(i as u32 + 1);
            nodes
                .push(
                    ComputingNode::new(id, NodeKind::EdgeDevice, "d", Location::new(*x, 0.0))
                        .with_compute(1, 1_000.0 * (i + 1) as f64),
                )
                .unwrap();
        }
        World::new(nodes, ClusterProtocol::new(ClusterParams::default().with_range(10.0)), 10.0)
    }

    #[test]
    fn test_only_devices_cluster() {
        let w = world();
        assert_eq!(w.clusters.len(), 2);
        assert!(w.orchestrator_of(NodeId(0)).is_err());
        assert_eq!(w.orchestrator_of(NodeId(2)), Ok(NodeId(2)));
    }

    #[test]
    fn test_stats_and_snapshot() {
        let mut w = world();
        let World {
            nodes,
            clusters,
            protocol,
            stats,
            ..
        } = &mut w;
        for outcome in protocol.full_pass(nodes, clusters, 1.0).unwrap() {
            stats.record(&outcome);
        }
        assert_eq!(w.stats.updates, 2);
        assert_eq!(w.stats.joins, 1);
        assert_eq!(w.cluster_members_of(NodeId(1)), Ok(vec![NodeId(1), NodeId(2)]));

        let snap = w.capture_snapshot(1.0).unwrap();
        assert_eq!(snap.cluster_count(), 1);
        assert_eq!(w.snapshots, vec![snap]);
    }

    #[test]
    fn test_select_destination() {
        let w = world();
        let task = Task::new(TaskId(0), 0, NodeId(1));
        assert_eq!(w.select_destination(&task, ArchitectureFilter::CloudOnly, 0.0), Ok(NodeId(0)));
    }
}
