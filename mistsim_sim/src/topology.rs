//! Node factory: device profiles, datacenter grid, random placement.

use mistsim_core::{ComputingNode, CoreError, MapBounds, MobilityModel, MobilityParams, NodeTable, Waypoints};
use mistsim_env::{streams, Battery, Location, NodeId, NodeKind, PowerSource, SeedTree};
use nalgebra::Vector2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use tracing::debug;

use crate::error::SimError;
use crate::world::SimConfig;

/// Kind of mist device, with its hardware and mobility defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    Smartphone,
    Laptop,
    RaspberryPi,
    Sensor,
}

impl DeviceProfile {
    pub fn all() -> [DeviceProfile; 4] {
        [
            DeviceProfile::Smartphone,
            DeviceProfile::Laptop,
            DeviceProfile::RaspberryPi,
            DeviceProfile::Sensor,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceProfile::Smartphone => "smartphone",
            DeviceProfile::Laptop => "laptop",
            DeviceProfile::RaspberryPi => "raspberry-pi",
            DeviceProfile::Sensor => "sensor",
        }
    }

    /// `(cores, mips_per_core)`
    pub fn compute(&self) -> (u32, f64) {
        match self {
            DeviceProfile::Smartphone => (8, 25_000.0),
            DeviceProfile::Laptop => (4, 110_000.0),
            DeviceProfile::RaspberryPi => (4, 8_000.0),
            DeviceProfile::Sensor => (1, 1_000.0),
        }
    }

    /// `(capacity_wh, idle_drain_w)`, or `None` for mains-powered profiles.
    pub fn battery(&self) -> Option<(f64, f64)> {
        match self {
            DeviceProfile::Smartphone => Some((18.5, 1.5)),
            DeviceProfile::Laptop => Some((56.0, 10.0)),
            DeviceProfile::RaspberryPi => None,
            DeviceProfile::Sensor => Some((2.0, 0.05)),
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceProfile::Smartphone | DeviceProfile::Laptop)
    }

    /// Power source at `initial_percentage` charge.
    pub fn power(&self, initial_percentage: f64) -> PowerSource {
        match self.battery() {
            Some((capacity, drain)) => PowerSource::Battery(Battery::new(capacity, initial_percentage, drain)),
            None => PowerSource::Mains,
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builds a [`NodeTable`] with ids assigned in insertion order.
///
/// Mobile nodes draw from their own mobility stream keyed by node id.
pub struct NodeFactory {
    seeds: SeedTree,
    mobility: MobilityParams,
    nodes: NodeTable,
}

impl NodeFactory {
    pub fn new(seeds: SeedTree, mobility: MobilityParams) -> Self {
        Self {
            seeds,
            mobility,
            nodes: NodeTable::new(),
        }
    }

    pub fn next_id(&self) -> NodeId {
        self.nodes.next_id()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cloud(&mut self, location: Location) -> Result<NodeId, CoreError> {
        let id = self.next_id();
        self.nodes
            .push(ComputingNode::new(id, NodeKind::Cloud, "cloud", location).with_compute(64, 40_000.0))
    }

    pub fn datacenter(&mut self, location: Location) -> Result<NodeId, CoreError> {
        let id = self.next_id();
        self.nodes.push(
            ComputingNode::new(id, NodeKind::EdgeDatacenter, "edge", location)
                .with_compute(16, 30_000.0)
                .with_peripheral(true),
        )
    }

    /// Adds a device. Scripted waypoints make even a stationary profile move.
    pub fn device(
        &mut self,
        profile: DeviceProfile,
        start: Location,
        battery_percentage: f64,
        waypoints: Waypoints,
    ) -> Result<NodeId, CoreError> {
        let id = self.next_id();
        let mobility = if profile.is_mobile() || !waypoints.is_empty() {
            MobilityModel::mobile(id, start, self.mobility, waypoints, self.mobility_stream(id))
        } else {
            MobilityModel::stationary(id, start)
        };
        let (cores, mips) = profile.compute();
        self.nodes.push(
            ComputingNode::new(id, NodeKind::EdgeDevice, profile.name(), start)
                .with_compute(cores, mips)
                .with_power(profile.power(battery_percentage))
                .with_mobility(mobility),
        )
    }

    /// Adds a fully specified node; its id must be [`NodeFactory::next_id`].
    pub fn push(&mut self, node: ComputingNode) -> Result<NodeId, CoreError> {
        self.nodes.push(node)
    }

    pub fn mobility_stream(&self, id: NodeId) -> ChaCha8Rng {
        self.seeds.stream(streams::MOBILITY, id.raw() as u64)
    }

    /// Generates every trajectory and hands the table over.
    pub fn finish(mut self, config: &SimConfig) -> Result<NodeTable, CoreError> {
        self.nodes.generate_paths(
            config.duration + config.update_interval,
            config.update_interval,
            config.map,
            config.edge_datacenters_range,
        )?;
        Ok(self.nodes)
    }
}

/// Cell centers of the most square grid holding `count` datacenters.
pub fn datacenter_grid(bounds: &MapBounds, count: usize) -> Vec<Location> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    let cell = Vector2::new(bounds.length / cols as f64, bounds.width / rows as f64);

    (0..count)
        .map(|i| {
            let slot = Vector2::new((i % cols) as f64 + 0.5, (i / cols) as f64 + 0.5);
            Location::from_vector(slot.component_mul(&cell))
        })
        .collect()
}

/// One cloud at the map center, a datacenter grid and randomly placed
/// devices with random profiles.
pub fn standard_topology(config: &SimConfig) -> Result<NodeTable, SimError> {
    standard_topology_with(config, &DeviceProfile::all())
}

/// Like [`standard_topology`], drawing profiles only from `profiles`.
pub fn standard_topology_with(config: &SimConfig, profiles: &[DeviceProfile]) -> Result<NodeTable, SimError> {
    config.validate()?;
    if profiles.is_empty() {
        return Err(mistsim_env::EnvError::invalid("no device profile to draw from").into());
    }
    let seeds = SeedTree::new(config.seed);
    let mut rng = seeds.stream(streams::TOPOLOGY, 0);
    let mut factory = NodeFactory::new(seeds, config.mobility);

    factory.cloud(config.map.center())?;
    for loc in datacenter_grid(&config.map, config.num_datacenters) {
        factory.datacenter(loc)?;
    }

    let charge = Uniform::new_inclusive(50.0, 100.0);
    for _ in 0..config.num_devices {
        let profile = profiles[rng.gen_range(0..profiles.len())];
        let start = config.map.random_point(&mut rng);
        let pct = charge.sample(&mut rng);
        let id = factory.device(profile, start, pct, Waypoints::default())?;
        debug!("{} {} at ({:.1}, {:.1}), {:.0}%", id, profile, start.x, start.y, pct);
    }

    Ok(factory.finish(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout() {
        let grid = datacenter_grid(&MapBounds::new(200.0, 100.0), 4);
        assert_eq!(
            grid,
            vec![
                Location::new(50.0, 25.0),
                Location::new(150.0, 25.0),
                Location::new(50.0, 75.0),
                Location::new(150.0, 75.0),
            ]
        );
        assert!(datacenter_grid(&MapBounds::default(), 0).is_empty());
        assert_eq!(datacenter_grid(&MapBounds::default(), 3).len(), 3);
    }

    #[test]
    fn test_standard_topology_layout() {
        let config = SimConfig::default().with_devices(12).with_duration(20.0);
        let nodes = standard_topology(&config).unwrap();

        assert_eq!(nodes.len(), 1 + config.num_datacenters + 12);
        assert_eq!(nodes.of_kind(NodeKind::Cloud).count(), 1);
        assert_eq!(nodes.edge_datacenters().len(), config.num_datacenters);
        assert_eq!(nodes.edge_devices().len(), 12);
        for node in nodes.iter() {
            assert!(config.map.contains(&node.location_at(0.0)));
            assert!(node.mobility.is_generated());
        }
    }

    #[test]
    fn test_same_seed_same_topology() {
        let config = SimConfig::default().with_seed(7).with_duration(30.0);
        let a = standard_topology(&config).unwrap();
        let b = standard_topology(&config).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.device_type, y.device_type);
            assert_eq!(x.location_at(25.0), y.location_at(25.0));
        }

        let c = standard_topology(&config.clone().with_seed(8)).unwrap();
        let moved = a
            .iter()
            .zip(c.iter())
            .any(|(x, y)| x.location_at(0.0) != y.location_at(0.0));
        assert!(moved);
    }

    #[test]
    fn test_stationary_profile_with_waypoints_moves() {
        let config = SimConfig::default().with_duration(10.0);
        let mut factory = NodeFactory::new(SeedTree::new(1), MobilityParams::default().with_speed(2.0));
        let pi = factory
            .device(DeviceProfile::RaspberryPi, Location::new(10.0, 10.0), 100.0, Waypoints::default())
            .unwrap();
        let scripted = factory
            .device(
                DeviceProfile::Sensor,
                Location::new(10.0, 10.0),
                100.0,
                Waypoints::new([Location::new(100.0, 10.0)]),
            )
            .unwrap();
        let nodes = factory.finish(&config).unwrap();

        assert!(!nodes.get(pi).unwrap().is_mobile());
        assert!(nodes.get(scripted).unwrap().is_mobile());
        assert!(nodes.get(scripted).unwrap().location_at(5.0).x > 10.0);
    }

    #[test]
    fn test_profiles() {
        assert!(DeviceProfile::RaspberryPi.battery().is_none());
        assert_eq!(DeviceProfile::RaspberryPi.power(30.0), PowerSource::Mains);
        assert_eq!(DeviceProfile::Laptop.to_string(), "laptop");
        assert!(DeviceProfile::all().iter().filter(|p| p.is_mobile()).count() == 2);
    }
}
