//! Point-in-time view of the cluster forest, for export and assertions.

use mistsim_env::{EnergyModel, NodeId};
use serde::Serialize;

use super::registry::ClusterRegistry;
use crate::error::CoreError;
use crate::node::NodeTable;

/// One clustering node at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub parent: NodeId,
    pub orchestrator: NodeId,
    pub depth: usize,
    pub weight: f64,
    pub battery: Option<f64>,
}

/// The forest at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    pub time: f64,
    pub nodes: Vec<NodeState>,
    pub orchestrators: Vec<NodeId>,
}

impl ClusterSnapshot {
    /// Captures every registry member at `time`.
    ///
    /// Fails with `BrokenForest` if any chain does not terminate.
    pub fn capture(nodes: &NodeTable, registry: &ClusterRegistry, time: f64) -> Result<Self, CoreError> {
        let mut states = Vec::with_capacity(registry.len());
        for id in registry.members() {
            let node = nodes.get(id)?;
            let loc = node.location_at(time);
            states.push(NodeState {
                id,
                x: loc.x,
                y: loc.y,
                parent: registry.parent_of(id)?,
                orchestrator: registry.orchestrator_of(id)?,
                depth: registry.depth_of(id)?,
                weight: registry.cached_weight(id)?,
                battery: node
                    .power
                    .is_battery_powered()
                    .then(|| node.power.battery_level_percentage()),
            });
        }
        Ok(Self {
            time,
            nodes: states,
            orchestrators: registry.orchestrators(),
        })
    }

    pub fn cluster_count(&self) -> usize {
        self.orchestrators.len()
    }

    /// Size of the largest cluster.
    pub fn largest_cluster(&self) -> usize {
        self.orchestrators
            .iter()
            .map(|root| self.nodes.iter().filter(|n| n.orchestrator == *root).count())
            .max()
            .unwrap_or(0)
    }

    /// Every node's orchestrator is a listed root and its depth matches the
    /// parent chain.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|n| {
            let root_ok = self.orchestrators.contains(&n.orchestrator);
            let self_ok = (n.parent == n.id) == (n.depth == 0);
            root_ok && self_ok
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ComputingNode;
    use mistsim_env::{Location, NodeKind};

    #[test]
    fn test_capture() {
        let mut nodes = NodeTable::new();
        for (i, x) in [0.0, 5.0, 9.0].iter().enumerate() {
            nodes
                .push(ComputingNode::new(
                    NodeId(i as u32),
                    NodeKind::EdgeDevice,
                    "d",
                    Location::new(*x, 1.0),
                ))
                .unwrap();
        }
        let mut registry = ClusterRegistry::with_members(nodes.edge_devices());
        registry.set_parent(NodeId(0), NodeId(1)).unwrap();

        let snap = ClusterSnapshot::capture(&nodes, &registry, 3.0).unwrap();
        assert_eq!(snap.cluster_count(), 2);
        assert_eq!(snap.largest_cluster(), 2);
        assert_eq!(snap.nodes[0].orchestrator, NodeId(1));
        assert_eq!(snap.nodes[0].depth, 1);
        assert_eq!(snap.nodes[2].x, 9.0);
        assert!(snap.is_consistent());
    }
}
