//! The per-node cluster update.
//!
//! One update for node `n` at time `t`:
//!
//! 1. Compute `weight(n, t)` from current and predicted neighbors.
//! 2. If `n` is a member, break away when its parent left range or when its
//!    own weight beats the decayed weight it inherits from its orchestrator.
//! 3. Among one-hop neighbors outside `n`'s own subtree, find the greatest
//!    effective weight `weight(root(m)) * (1 - drop)^depth(m)`.
//! 4. Join that neighbor if it beats `n`'s own standing (its weight as a
//!    root, its effective weight as a member).
//!
//! Roots are resolved live from the registry, so nodes updated earlier in
//! the same pass are seen in their new clusters.

use std::collections::BTreeMap;

use mistsim_env::{EnergyModel, NodeId};
use serde::Serialize;
use tracing::{debug, trace};

use super::registry::ClusterRegistry;
use super::weight::{WeightBreakdown, WeightInputs, WeightPolicy};
use crate::error::CoreError;
use crate::node::NodeTable;

/// Tunables of the clustering protocol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// One-hop connectivity range between devices, in meters.
    pub range: f64,

    /// Seconds between two ticks of the same node; also the look-ahead
    /// used for predicted neighbors.
    pub update_interval: f64,

    pub policy: WeightPolicy,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            range: 30.0,
            update_interval: 1.0,
            policy: WeightPolicy::unweighted(),
        }
    }
}

impl ClusterParams {
    pub fn with_range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    pub fn with_update_interval(mut self, interval: f64) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn with_policy(mut self, policy: WeightPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Why a member became its own orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakReason {
    /// Its own weight beat the weight inherited from its orchestrator.
    Outweighed,

    /// Its parent moved out of range.
    BrokenLink,
}

/// What one update did to a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub node: NodeId,
    pub time: f64,
    pub weight: WeightBreakdown,
    pub previous_parent: NodeId,
    pub parent: NodeId,
    pub broke_away: Option<BreakReason>,
    pub joined: Option<NodeId>,
}

impl UpdateOutcome {
    pub fn parent_changed(&self) -> bool {
        self.previous_parent != self.parent
    }
}

/// Weights computed at one instant. Weights depend on positions and
/// batteries only, never on cluster state, so they are shared by every
/// update at the same time.
#[derive(Debug, Clone, Default)]
struct WeightCache {
    time_bits: u64,
    weights: BTreeMap<NodeId, WeightBreakdown>,
}

/// Weight-based clustering over the devices in a [`ClusterRegistry`].
#[derive(Debug, Clone)]
pub struct ClusterProtocol {
    params: ClusterParams,
    cache: WeightCache,
}

impl ClusterProtocol {
    pub fn new(params: ClusterParams) -> Self {
        Self {
            params,
            cache: WeightCache::default(),
        }
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn policy(&self) -> &WeightPolicy {
        &self.params.policy
    }

    /// Drops cached weights; call after battery levels change.
    pub fn invalidate(&mut self) {
        self.cache.weights.clear();
    }

    /// Registry members other than `node` within range at `time`, ascending.
    pub fn neighbors(
        &self,
        nodes: &NodeTable,
        registry: &ClusterRegistry,
        node: NodeId,
        time: f64,
    ) -> Result<Vec<NodeId>, CoreError> {
        let me = nodes.get(node)?.location_at(time);
        let mut found = Vec::new();
        for other in registry.members() {
            if other == node {
                continue;
            }
            if me.distance_to(&nodes.get(other)?.location_at(time)) <= self.params.range {
                found.push(other);
            }
        }
        Ok(found)
    }

    /// Weight of `node` at `time`, uncached.
    pub fn weight(
        &self,
        nodes: &NodeTable,
        registry: &ClusterRegistry,
        node: NodeId,
        time: f64,
    ) -> Result<WeightBreakdown, CoreError> {
        let current = self.neighbors(nodes, registry, node, time)?;
        let predicted = self.neighbors(nodes, registry, node, time + self.params.update_interval)?;

        let me = nodes.get(node)?;
        let here = me.location_at(time);
        let mut total_distance = 0.0;
        for m in &current {
            total_distance += here.distance_to(&nodes.get(*m)?.location_at(time));
        }
        let avg_distance = if current.is_empty() {
            0.0
        } else {
            total_distance / current.len() as f64
        };

        let inputs = WeightInputs {
            mips_per_core: me.mips_per_core,
            neighbors: current.len(),
            predicted_neighbors: predicted.len(),
            avg_distance,
            range: self.params.range,
            battery_percentage: me
                .power
                .is_battery_powered()
                .then(|| me.power.battery_level_percentage()),
        };
        let breakdown = self.params.policy.evaluate(&inputs);
        trace!(
            "weight {} t={:.3}: cap={:.4} nbr={} pred={} dist={:.3} batt={:.2} total={:.4}",
            node,
            time,
            breakdown.capacity_term,
            breakdown.neighbors,
            breakdown.predicted_neighbors,
            breakdown.distance_term,
            breakdown.battery_factor,
            breakdown.total
        );
        Ok(breakdown)
    }

    fn cached_weight(
        &mut self,
        nodes: &NodeTable,
        registry: &ClusterRegistry,
        node: NodeId,
        time: f64,
    ) -> Result<WeightBreakdown, CoreError> {
        if self.cache.time_bits != time.to_bits() {
            self.cache.time_bits = time.to_bits();
            self.cache.weights.clear();
        }
        if let Some(w) = self.cache.weights.get(&node) {
            return Ok(*w);
        }
        let w = self.weight(nodes, registry, node, time)?;
        self.cache.weights.insert(node, w);
        Ok(w)
    }

    /// `weight(root(node)) * (1 - drop)^depth(node)`, resolved live.
    fn effective_weight(
        &mut self,
        nodes: &NodeTable,
        registry: &ClusterRegistry,
        node: NodeId,
        time: f64,
    ) -> Result<f64, CoreError> {
        let root = registry.orchestrator_of(node)?;
        let depth = registry.depth_of(node)?;
        let root_weight = self.cached_weight(nodes, registry, root, time)?.total;
        Ok(root_weight * self.params.policy.decay(depth))
    }

    /// Runs one protocol update for `node` at `time`.
    pub fn update(
        &mut self,
        nodes: &NodeTable,
        registry: &mut ClusterRegistry,
        node: NodeId,
        time: f64,
    ) -> Result<UpdateOutcome, CoreError> {
        let weight = self.cached_weight(nodes, registry, node, time)?;
        let previous_parent = registry.parent_of(node)?;
        let mut broke_away = None;

        if previous_parent != node {
            let inherited = self.effective_weight(nodes, registry, node, time)?;
            let link = nodes
                .get(node)?
                .distance_at(nodes.get(previous_parent)?, time);
            let reason = if link > self.params.range {
                Some(BreakReason::BrokenLink)
            } else if weight.total > inherited {
                Some(BreakReason::Outweighed)
            } else {
                None
            };
            if let Some(reason) = reason {
                registry.make_root(node)?;
                debug!(
                    "{} broke away from {} at t={:.3} ({:?}, own {:.4} vs inherited {:.4}, link {:.1} m)",
                    node, previous_parent, time, reason, weight.total, inherited, link
                );
                broke_away = Some(reason);
            }
        }

        let standing = if registry.is_orchestrator(node) {
            weight.total
        } else {
            self.effective_weight(nodes, registry, node, time)?
        };

        let mut best: Option<(NodeId, f64)> = None;
        for m in self.neighbors(nodes, registry, node, time)? {
            if registry.is_in_subtree(m, node)? {
                continue;
            }
            let candidate = self.effective_weight(nodes, registry, m, time)?;
            if best.map_or(true, |(_, b)| candidate > b) {
                best = Some((m, candidate));
            }
        }

        let mut joined = None;
        let mut kept = standing;
        if let Some((m, candidate)) = best {
            if candidate > standing {
                if registry.set_parent(node, m)? {
                    debug!(
                        "{} joined {} (orchestrator {}) at t={:.3}: {:.4} > {:.4}",
                        node,
                        m,
                        registry.orchestrator_of(m)?,
                        time,
                        candidate,
                        standing
                    );
                    joined = Some(m);
                }
                kept = candidate;
            }
        }
        registry.set_cached_weight(node, kept)?;

        Ok(UpdateOutcome {
            node,
            time,
            weight,
            previous_parent,
            parent: registry.parent_of(node)?,
            broke_away,
            joined,
        })
    }

    /// Updates every registry member once, in ascending id order.
    pub fn full_pass(
        &mut self,
        nodes: &NodeTable,
        registry: &mut ClusterRegistry,
        time: f64,
    ) -> Result<Vec<UpdateOutcome>, CoreError> {
        let members: Vec<NodeId> = registry.members().collect();
        let mut outcomes = Vec::with_capacity(members.len());
        for node in members {
            outcomes.push(self.update(nodes, registry, node, time)?);
        }
        Ok(outcomes)
    }
}
