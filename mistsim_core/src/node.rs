//! Computing nodes and the table that owns them.

use mistsim_env::{EnergyModel, Location, NodeId, NodeKind, PowerSource};
use tracing::info;

use crate::error::CoreError;
use crate::mobility::{MapBounds, MobilityModel, PathPlan};

/// One cloud, edge datacenter or edge device.
#[derive(Debug, Clone)]
pub struct ComputingNode {
    pub id: NodeId,

    pub kind: NodeKind,

    /// Free-form device type name ("smartphone", "raspberry-pi", ...).
    pub device_type: String,

    pub cores: u32,

    /// Per-core capacity in MIPS.
    pub mips_per_core: f64,

    /// Edge datacenters only: whether devices may attach to it directly.
    pub peripheral: bool,

    pub mobility: MobilityModel,

    pub power: PowerSource,
}

impl ComputingNode {
    /// A mains-powered stationary node with no compute capacity.
    pub fn new(id: NodeId, kind: NodeKind, device_type: impl Into<String>, location: Location) -> Self {
        Self {
            id,
            kind,
            device_type: device_type.into(),
            cores: 1,
            mips_per_core: 0.0,
            peripheral: kind == NodeKind::EdgeDatacenter,
            mobility: MobilityModel::stationary(id, location),
            power: PowerSource::Mains,
        }
    }

    pub fn with_compute(mut self, cores: u32, mips_per_core: f64) -> Self {
        self.cores = cores;
        self.mips_per_core = mips_per_core;
        self
    }

    pub fn with_power(mut self, power: PowerSource) -> Self {
        self.power = power;
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityModel) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_peripheral(mut self, peripheral: bool) -> Self {
        self.peripheral = peripheral;
        self
    }

    pub fn is_mobile(&self) -> bool {
        self.mobility.is_mobile()
    }

    pub fn total_mips(&self) -> f64 {
        self.cores as f64 * self.mips_per_core
    }

    pub fn location_at(&self, time: f64) -> Location {
        self.mobility.location_at(time)
    }

    pub fn distance_at(&self, other: &ComputingNode, time: f64) -> f64 {
        self.mobility.distance_at(&other.mobility, time)
    }

    pub fn is_dead(&self) -> bool {
        self.power.is_dead()
    }
}

/// Dense, id-indexed store of every node in the topology.
///
/// Node ids equal their insertion index.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<ComputingNode>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id `push` will expect.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    /// Appends a node; its id must equal [`NodeTable::next_id`].
    pub fn push(&mut self, node: ComputingNode) -> Result<NodeId, CoreError> {
        if node.id != self.next_id() {
            return Err(CoreError::UnknownNode(node.id));
        }
        let id = node.id;
        self.nodes.push(node);
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Result<&ComputingNode, CoreError> {
        self.nodes.get(id.index()).ok_or(CoreError::UnknownNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut ComputingNode, CoreError> {
        self.nodes.get_mut(id.index()).ok_or(CoreError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComputingNode> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ComputingNode> {
        self.nodes.iter_mut()
    }

    /// All nodes of `kind`, in id order.
    pub fn of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &ComputingNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Ids of the mist devices (the nodes that cluster).
    pub fn edge_devices(&self) -> Vec<NodeId> {
        self.of_kind(NodeKind::EdgeDevice).map(|n| n.id).collect()
    }

    pub fn edge_datacenters(&self) -> Vec<NodeId> {
        self.of_kind(NodeKind::EdgeDatacenter).map(|n| n.id).collect()
    }

    /// Precomputes every node's trajectory. Peripheral edge datacenters are
    /// the facilities devices attach to.
    pub fn generate_paths(
        &mut self,
        duration: f64,
        update_interval: f64,
        bounds: MapBounds,
        facility_range: f64,
    ) -> Result<(), CoreError> {
        let facilities: Vec<(NodeId, Location)> = self
            .of_kind(NodeKind::EdgeDatacenter)
            .filter(|n| n.peripheral)
            .map(|n| (n.id, n.mobility.start()))
            .collect();
        let plan =
            PathPlan::new(duration, update_interval, bounds).with_facilities(facilities, facility_range);

        for node in &mut self.nodes {
            node.mobility.generate_path(&plan)?;
        }
        info!(
            "generated {} trajectories ({} s horizon, {} ms step)",
            self.nodes.len(),
            duration,
            plan.step_ms()
        );
        Ok(())
    }
}
