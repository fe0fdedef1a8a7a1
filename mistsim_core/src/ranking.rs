//! Destination ranking for offloaded tasks.
//!
//! Candidates are filtered by a [`PlacementPolicy`], scored, and the
//! strictly highest positive score wins. Ranking only reads node and
//! cluster state.

use std::str::FromStr;

use mistsim_env::{EnergyModel, EnvError, NodeId, NodeKind};
use serde::Serialize;
use tracing::trace;

use crate::cluster::ClusterRegistry;
use crate::error::CoreError;
use crate::node::{ComputingNode, NodeTable};
use crate::task::Task;

/// Which tiers may execute a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArchitectureFilter {
    CloudOnly,
    EdgeOnly,
    MistOnly,
    EdgeAndCloud,
    MistAndCloud,
    MistAndEdge,
    All,

    /// Mist devices in the task source's own cluster.
    ClusterOnly,
}

impl ArchitectureFilter {
    pub fn all() -> [ArchitectureFilter; 8] {
        [
            Self::CloudOnly,
            Self::EdgeOnly,
            Self::MistOnly,
            Self::EdgeAndCloud,
            Self::MistAndCloud,
            Self::MistAndEdge,
            Self::All,
            Self::ClusterOnly,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CloudOnly => "CLOUD_ONLY",
            Self::EdgeOnly => "EDGE_ONLY",
            Self::MistOnly => "MIST_ONLY",
            Self::EdgeAndCloud => "EDGE_AND_CLOUD",
            Self::MistAndCloud => "MIST_AND_CLOUD",
            Self::MistAndEdge => "MIST_AND_EDGE",
            Self::All => "ALL",
            Self::ClusterOnly => "CLUSTER_ONLY",
        }
    }

    /// Returns true if nodes of `kind` pass this filter.
    pub fn allows(&self, kind: NodeKind) -> bool {
        use NodeKind::*;
        match self {
            Self::CloudOnly => kind == Cloud,
            Self::EdgeOnly => kind == EdgeDatacenter,
            Self::MistOnly | Self::ClusterOnly => kind == EdgeDevice,
            Self::EdgeAndCloud => kind != EdgeDevice,
            Self::MistAndCloud => kind != EdgeDatacenter,
            Self::MistAndEdge => kind != Cloud,
            Self::All => true,
        }
    }
}

impl std::fmt::Display for ArchitectureFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ArchitectureFilter {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::all()
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| EnvError::invalid(format!("unknown architecture filter: {}", s)))
    }
}

/// Read-only state a placement decision may look at.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub nodes: &'a NodeTable,
    pub clusters: &'a ClusterRegistry,
    pub time: f64,
}

/// Decides whether a node may execute a task at all.
pub trait PlacementPolicy {
    fn is_eligible(
        &self,
        ctx: &PlacementContext<'_>,
        task: &Task,
        candidate: &ComputingNode,
        filter: ArchitectureFilter,
    ) -> bool;
}

/// Range-based eligibility.
///
/// - dead batteries and nodes without compute capacity are never eligible
/// - mist devices: the source itself, or within `edge_devices_range` of it;
///   under `ClusterOnly` they must also share the source's orchestrator
/// - edge datacenters: within `edge_datacenters_range` of the source
/// - the cloud: always reachable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultPlacement {
    pub edge_devices_range: f64,
    pub edge_datacenters_range: f64,
}

impl Default for DefaultPlacement {
    fn default() -> Self {
        Self {
            edge_devices_range: 30.0,
            edge_datacenters_range: 200.0,
        }
    }
}

impl PlacementPolicy for DefaultPlacement {
    fn is_eligible(
        &self,
        ctx: &PlacementContext<'_>,
        task: &Task,
        candidate: &ComputingNode,
        filter: ArchitectureFilter,
    ) -> bool {
        if !filter.allows(candidate.kind) || candidate.is_dead() || candidate.total_mips() <= 0.0 {
            return false;
        }
        let source = match ctx.nodes.get(task.source) {
            Ok(source) => source,
            Err(_) => return false,
        };
        let distance = source.distance_at(candidate, ctx.time);

        match candidate.kind {
            NodeKind::Cloud => true,
            NodeKind::EdgeDatacenter => distance <= self.edge_datacenters_range,
            NodeKind::EdgeDevice => {
                let reachable = candidate.id == source.id || distance <= self.edge_devices_range;
                if filter != ArchitectureFilter::ClusterOnly {
                    return reachable;
                }
                let same_cluster = match (
                    ctx.clusters.orchestrator_of(source.id),
                    ctx.clusters.orchestrator_of(candidate.id),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                };
                reachable && same_cluster
            }
        }
    }
}

/// What to do when no candidate scores above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FallbackMode {
    /// Report `NoEligibleDestination`.
    #[default]
    Strict,

    /// Return the first candidate whether or not it was eligible.
    FirstCandidate,
}

/// Scores eligible nodes by capacity, battery and mobility.
///
/// `score = mips_per_core / normalizer + battery + mobility`, where battery
/// is the charge fraction (1 on mains) and mobility is 1 for stationary
/// nodes, 0 for mobile ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestinationRanking {
    pub fallback: FallbackMode,
    pub capacity_normalizer: f64,
}

impl Default for DestinationRanking {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::Strict,
            capacity_normalizer: 200_000.0,
        }
    }
}

impl DestinationRanking {
    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn score(&self, node: &ComputingNode) -> f64 {
        let compute = node.mips_per_core / self.capacity_normalizer;
        let battery = if node.power.is_battery_powered() {
            node.power.battery_level_percentage() / 100.0
        } else {
            1.0
        };
        let mobility = if node.is_mobile() { 0.0 } else { 1.0 };
        compute + battery + mobility
    }

    /// Picks the eligible candidate with the strictly highest score.
    /// Ties keep the earliest candidate.
    pub fn select<'a, P, I>(
        &self,
        ctx: &PlacementContext<'_>,
        candidates: I,
        task: &Task,
        filter: ArchitectureFilter,
        policy: &P,
    ) -> Result<NodeId, CoreError>
    where
        P: PlacementPolicy + ?Sized,
        I: IntoIterator<Item = &'a ComputingNode>,
    {
        let mut first = None;
        let mut best: Option<NodeId> = None;
        let mut best_score = 0.0;

        for node in candidates {
            first.get_or_insert(node.id);
            if !policy.is_eligible(ctx, task, node, filter) {
                continue;
            }
            let score = self.score(node);
            trace!("task {} candidate {} score {:.4}", task.id, node.id, score);
            if score > best_score {
                best_score = score;
                best = Some(node.id);
            }
        }

        match (best, self.fallback) {
            (Some(id), _) => Ok(id),
            (None, FallbackMode::FirstCandidate) => first.ok_or(CoreError::NoEligibleDestination(task.id)),
            (None, FallbackMode::Strict) => Err(CoreError::NoEligibleDestination(task.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mobility::{MobilityModel, MobilityParams, Waypoints};
    use crate::task::TaskId;
    use approx::assert_relative_eq;
    use mistsim_env::{Battery, Location, PowerSource};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn mobile_device(id: u32, x: f64, mips: f64, battery_pct: f64) -> ComputingNode {
        let mobility = MobilityModel::mobile(
            NodeId(id),
            Location::new(x, 0.0),
            MobilityParams::default(),
            Waypoints::default(),
            ChaCha8Rng::seed_from_u64(id as u64),
        );
        ComputingNode::new(NodeId(id), NodeKind::EdgeDevice, "phone", Location::new(x, 0.0))
            .with_compute(1, mips)
            .with_mobility(mobility)
            .with_power(PowerSource::Battery(Battery::new(10.0, battery_pct, 0.0)))
    }

    /// 0: cloud, 1: edge datacenter at 100 m, 2: mobile device (source), 3: device at 20 m
    fn topology() -> NodeTable {
        let mut nodes = NodeTable::new();
        nodes
            .push(ComputingNode::new(NodeId(0), NodeKind::Cloud, "cloud", Location::new(5000.0, 5000.0)).with_compute(8, 40_000.0))
            .unwrap();
        nodes
            .push(
                ComputingNode::new(NodeId(1), NodeKind::EdgeDatacenter, "edge", Location::new(100.0, 0.0))
                    .with_compute(4, 400_000.0),
            )
            .unwrap();
        nodes.push(mobile_device(2, 0.0, 400_000.0, 40.0)).unwrap();
        nodes.push(mobile_device(3, 20.0, 100_000.0, 100.0)).unwrap();
        nodes
    }

    fn ctx<'a>(nodes: &'a NodeTable, clusters: &'a ClusterRegistry) -> PlacementContext<'a> {
        PlacementContext { nodes, clusters, time: 0.0 }
    }

    #[test]
    fn test_station_beats_mobile_device() {
        let nodes = topology();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let ranking = DestinationRanking::default();

        assert_relative_eq!(ranking.score(nodes.get(NodeId(1)).unwrap()), 4.0);
        assert_relative_eq!(ranking.score(nodes.get(NodeId(2)).unwrap()), 2.4, epsilon = 1e-12);

        let task = Task::new(TaskId(1), 0, NodeId(2));
        let chosen = ranking
            .select(&ctx(&nodes, &clusters), nodes.iter(), &task, ArchitectureFilter::MistAndEdge, &DefaultPlacement::default())
            .unwrap();
        assert_eq!(chosen, NodeId(1));
    }

    #[test]
    fn test_filter_restricts_tiers() {
        let nodes = topology();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let ranking = DestinationRanking::default();
        let task = Task::new(TaskId(1), 0, NodeId(2));
        let policy = DefaultPlacement::default();
        let c = ctx(&nodes, &clusters);

        assert_eq!(ranking.select(&c, nodes.iter(), &task, ArchitectureFilter::CloudOnly, &policy), Ok(NodeId(0)));
        // 2.0 + 0.4 for the source vs 0.5 + 1.0 for its neighbor
        assert_eq!(ranking.select(&c, nodes.iter(), &task, ArchitectureFilter::MistOnly, &policy), Ok(NodeId(2)));
    }

    #[test]
    fn test_out_of_range_edge_is_ineligible() {
        let nodes = topology();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let task = Task::new(TaskId(7), 0, NodeId(2));
        let policy = DefaultPlacement {
            edge_devices_range: 30.0,
            edge_datacenters_range: 50.0,
        };
        let result = DestinationRanking::default().select(
            &ctx(&nodes, &clusters),
            nodes.iter(),
            &task,
            ArchitectureFilter::EdgeOnly,
            &policy,
        );
        assert_eq!(result, Err(CoreError::NoEligibleDestination(TaskId(7))));
    }

    #[test]
    fn test_first_candidate_fallback() {
        let nodes = topology();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let task = Task::new(TaskId(7), 0, NodeId(2));
        let policy = DefaultPlacement {
            edge_devices_range: 30.0,
            edge_datacenters_range: 50.0,
        };
        let ranking = DestinationRanking::default().with_fallback(FallbackMode::FirstCandidate);
        let result = ranking.select(&ctx(&nodes, &clusters), nodes.iter(), &task, ArchitectureFilter::EdgeOnly, &policy);
        assert_eq!(result, Ok(NodeId(0)));

        let empty: Vec<ComputingNode> = Vec::new();
        assert!(ranking
            .select(&ctx(&nodes, &clusters), empty.iter(), &task, ArchitectureFilter::All, &policy)
            .is_err());
    }

    #[test]
    fn test_cluster_only_requires_same_orchestrator() {
        let nodes = topology();
        let mut clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let ranking = DestinationRanking::default();
        let policy = DefaultPlacement::default();
        // Node 2 is the only candidate offered.
        let task = Task::new(TaskId(1), 0, NodeId(3));

        let pick = |clusters: &ClusterRegistry| {
            let candidates = [nodes.get(NodeId(2)).unwrap()];
            ranking.select(&ctx(&nodes, clusters), candidates, &task, ArchitectureFilter::ClusterOnly, &policy)
        };
        assert!(pick(&clusters).is_err());
        clusters.set_parent(NodeId(3), NodeId(2)).unwrap();
        assert_eq!(pick(&clusters), Ok(NodeId(2)));
    }

    #[test]
    fn test_dead_battery_is_ineligible() {
        let mut nodes = topology();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        nodes.get_mut(NodeId(3)).unwrap().power = PowerSource::Battery(Battery::new(10.0, 0.0, 0.0));
        let task = Task::new(TaskId(1), 0, NodeId(2));
        let candidate = nodes.get(NodeId(3)).unwrap();
        assert!(!DefaultPlacement::default().is_eligible(&ctx(&nodes, &clusters), &task, candidate, ArchitectureFilter::MistOnly));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("CLOUD_ONLY".parse::<ArchitectureFilter>().unwrap(), ArchitectureFilter::CloudOnly);
        assert_eq!("mist-and-edge".parse::<ArchitectureFilter>().unwrap(), ArchitectureFilter::MistAndEdge);
        assert!("EVERYWHERE".parse::<ArchitectureFilter>().is_err());
        assert!(ArchitectureFilter::EdgeAndCloud.allows(NodeKind::Cloud));
        assert!(!ArchitectureFilter::EdgeAndCloud.allows(NodeKind::EdgeDevice));
    }

    #[test]
    fn test_ties_keep_first_seen_candidate() {
        let mut nodes = topology();
        nodes
            .push(
                ComputingNode::new(NodeId(4), NodeKind::EdgeDatacenter, "edge", Location::new(0.0, 100.0))
                    .with_compute(4, 400_000.0),
            )
            .unwrap();
        let clusters = ClusterRegistry::with_members(nodes.edge_devices());
        let ranking = DestinationRanking::default();
        let (a, b) = (nodes.get(NodeId(1)).unwrap(), nodes.get(NodeId(4)).unwrap());
        assert_eq!(ranking.score(a), ranking.score(b));

        let task = Task::new(TaskId(1), 0, NodeId(2));
        let ctx = ctx(&nodes, &clusters);
        let placement = DefaultPlacement::default();
        let forward = ranking.select(&ctx, [a, b], &task, ArchitectureFilter::EdgeOnly, &placement);
        let reversed = ranking.select(&ctx, [b, a], &task, ArchitectureFilter::EdgeOnly, &placement);
        assert_eq!(forward, Ok(NodeId(1)));
        assert_eq!(reversed, Ok(NodeId(4)));
    }
}
