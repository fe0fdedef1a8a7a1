//! SimWorld - configuration and assembly of one simulation run.

use mistsim_core::{
    ArchitectureFilter, ClusterAgent, ClusterParams, ClusterProtocol, DefaultPlacement,
    DestinationRanking, FallbackMode, MapBounds, MobilityParams, NodeTable, RunSummary, Simulation,
    WeightPolicy, World,
};
use mistsim_env::{EnvError, SeedTree};
use tracing::info;

use crate::error::SimError;
use crate::manager::SimulationManager;
use crate::probe::OrchestrationProbe;
use crate::topology::standard_topology;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of mist devices
    pub num_devices: usize,

    /// Number of edge datacenters laid out on a grid
    pub num_datacenters: usize,

    /// Simulated horizon in seconds
    pub duration: f64,

    /// Clustering update and trajectory sampling interval in seconds
    pub update_interval: f64,

    /// Battery drain and cluster snapshot interval in seconds
    pub status_interval: f64,

    /// Placement request interval in seconds (0 = no probe)
    pub probe_interval: f64,

    pub map: MapBounds,

    /// Connectivity range between mist devices
    pub cluster_range: f64,

    pub edge_devices_range: f64,

    pub edge_datacenters_range: f64,

    pub mobility: MobilityParams,

    pub policy: WeightPolicy,

    /// Destinations the probe offers tasks to
    pub filter: ArchitectureFilter,

    pub fallback: FallbackMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_devices: 20,
            num_datacenters: 4,
            duration: 300.0,
            update_interval: 1.0,
            status_interval: 10.0,
            probe_interval: 2.0,
            map: MapBounds::new(200.0, 200.0),
            cluster_range: 30.0,
            edge_devices_range: 30.0,
            edge_datacenters_range: 200.0,
            mobility: MobilityParams::default(),
            policy: WeightPolicy::unweighted(),
            filter: ArchitectureFilter::All,
            fallback: FallbackMode::Strict,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_devices(mut self, n: usize) -> Self {
        self.num_devices = n;
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    pub fn with_update_interval(mut self, secs: f64) -> Self {
        self.update_interval = secs;
        self
    }

    pub fn with_status_interval(mut self, secs: f64) -> Self {
        self.status_interval = secs;
        self
    }

    pub fn with_probe_interval(mut self, secs: f64) -> Self {
        self.probe_interval = secs;
        self
    }

    pub fn with_map(mut self, map: MapBounds) -> Self {
        self.map = map;
        self
    }

    /// Sets the clustering range and the device placement range together.
    pub fn with_range(mut self, range: f64) -> Self {
        self.cluster_range = range;
        self.edge_devices_range = range;
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityParams) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_policy(mut self, policy: WeightPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_filter(mut self, filter: ArchitectureFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn seeds(&self) -> SeedTree {
        SeedTree::new(self.seed)
    }

    /// Checks ranges and intervals before anything is built.
    pub fn validate(&self) -> Result<(), EnvError> {
        let positive = [
            ("duration", self.duration),
            ("update_interval", self.update_interval),
            ("status_interval", self.status_interval),
            ("map length", self.map.length),
            ("map width", self.map.width),
            ("cluster_range", self.cluster_range),
            ("edge_devices_range", self.edge_devices_range),
            ("edge_datacenters_range", self.edge_datacenters_range),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(EnvError::invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(self.probe_interval >= 0.0) {
            return Err(EnvError::invalid(format!(
                "probe_interval must be >= 0, got {}",
                self.probe_interval
            )));
        }
        if self.update_interval > self.duration {
            return Err(EnvError::invalid(format!(
                "update_interval {} exceeds duration {}",
                self.update_interval, self.duration
            )));
        }
        let w = self.policy.weight_drop;
        if !(0.0..1.0).contains(&w) {
            return Err(EnvError::invalid(format!("weight_drop must be in [0, 1), got {}", w)));
        }
        self.mobility.validate()
    }
}

/// A ready-to-run simulation: the world plus its registered entities.
///
/// Registration order is manager, one cluster agent per device in id
/// order, then the probe. Same-time events follow that order.
pub struct SimWorld {
    config: SimConfig,
    simulation: Simulation<World>,
}

impl SimWorld {
    /// Builds the standard random topology for `config`.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let nodes = standard_topology(&config)?;
        Self::with_nodes(config, nodes)
    }

    /// Wraps an already generated node table.
    pub fn with_nodes(config: SimConfig, nodes: NodeTable) -> Result<Self, SimError> {
        config.validate()?;

        let params = ClusterParams::default()
            .with_range(config.cluster_range)
            .with_update_interval(config.update_interval)
            .with_policy(config.policy);
        let placement = DefaultPlacement {
            edge_devices_range: config.edge_devices_range,
            edge_datacenters_range: config.edge_datacenters_range,
        };
        let world = World::new(nodes, ClusterProtocol::new(params), config.duration)
            .with_ranking(DestinationRanking::default().with_fallback(config.fallback))
            .with_placement(placement);

        let devices = world.nodes.edge_devices();
        let mut simulation = Simulation::new(world);
        simulation.register(Box::new(SimulationManager::new(config.status_interval)));
        for id in &devices {
            simulation.register(Box::new(ClusterAgent::new(*id)));
        }
        if config.probe_interval > 0.0 {
            let rng = config.seeds().stream(mistsim_env::streams::PROBE, 0);
            simulation.register(Box::new(OrchestrationProbe::new(
                config.probe_interval,
                config.filter,
                rng,
            )));
        }
        info!(
            "SimWorld ready: seed={} devices={} entities={} policy={}",
            config.seed,
            devices.len(),
            simulation.entity_count(),
            config.policy.name
        );

        Ok(Self { config, simulation })
    }

    /// Runs to completion.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        Ok(self.simulation.run()?)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        self.simulation.world()
    }

    pub fn simulation(&self) -> &Simulation<World> {
        &self.simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_config() {
        let cases = [
            SimConfig::default().with_duration(0.0),
            SimConfig::default().with_update_interval(-1.0),
            SimConfig::default().with_duration(5.0).with_update_interval(10.0),
            SimConfig::default().with_range(f64::NAN),
            SimConfig::default().with_mobility(MobilityParams::default().with_pause(10.0, 1.0)),
            SimConfig::default().with_policy(WeightPolicy::unweighted().with_weight_drop(1.0)),
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(EnvError::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_entities_registered() {
        let config = SimConfig::default().with_devices(5).with_duration(20.0);
        let world = SimWorld::new(config).unwrap();
        // manager + 5 agents + probe
        assert_eq!(world.simulation().entity_count(), 7);

        let quiet = SimWorld::new(SimConfig::default().with_devices(5).with_duration(20.0).with_probe_interval(0.0))
            .unwrap();
        assert_eq!(quiet.simulation().entity_count(), 6);
    }

    #[test]
    fn test_run_produces_snapshots_and_tasks() {
        let config = SimConfig::default().with_devices(8).with_duration(40.0);
        let mut sim = SimWorld::new(config).unwrap();
        let summary = sim.run().unwrap();

        assert!(summary.events_processed > 0);
        assert_eq!(summary.unhandled_events, 0);
        let world = sim.world();
        assert!(!world.snapshots.is_empty());
        assert!(world.snapshots.iter().all(|s| s.is_consistent()));
        assert!(world.clusters.check_forest().is_ok());
        assert!(!world.tasks.is_empty());
    }
}
