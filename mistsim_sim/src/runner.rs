//! Scenario runner - builds, runs and checks named scenarios.

use mistsim_core::{
    ClusterSnapshot, ComputingNode, FailureReason, MapBounds, MobilityParams, NodeTable, RunSummary,
    TaskStatus, Waypoints, WeightPolicy, World,
};
use mistsim_env::{Battery, Location, NodeId, NodeKind, PowerSource};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::scenarios::ScenarioId;
use crate::topology::{datacenter_grid, standard_topology, standard_topology_with, DeviceProfile, NodeFactory};
use crate::world::{SimConfig, SimWorld};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Dequeue-order fingerprint of the first run
    pub fingerprint: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

impl ScenarioResult {
    fn errored(scenario: ScenarioId, seed: u64, error: SimError) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            final_time_secs: 0.0,
            fingerprint: 0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    pub events_processed: u64,
    pub unhandled_events: u64,
    pub max_queue_len: usize,
    pub snapshots: usize,

    /// Mean orchestrator count over all snapshots
    pub avg_orchestrators: f64,

    pub final_orchestrators: usize,
    pub largest_cluster: usize,
    pub cluster_updates: u64,
    pub parent_changes: u64,
    pub outweighed: u64,
    pub broken_links: u64,
    pub placements_ok: u64,
    pub placements_failed: u64,
    pub dead_devices: usize,
}

impl ScenarioMetrics {
    pub fn collect(world: &World, summary: &RunSummary, max_queue_len: usize) -> Self {
        let snapshots = &world.snapshots;
        let avg_orchestrators = if snapshots.is_empty() {
            0.0
        } else {
            snapshots.iter().map(|s| s.cluster_count()).sum::<usize>() as f64 / snapshots.len() as f64
        };
        let last = snapshots.last();
        Self {
            events_processed: summary.events_processed,
            unhandled_events: summary.unhandled_events,
            max_queue_len,
            snapshots: snapshots.len(),
            avg_orchestrators,
            final_orchestrators: last.map_or(0, |s| s.cluster_count()),
            largest_cluster: last.map_or(0, |s| s.largest_cluster()),
            cluster_updates: world.stats.updates,
            parent_changes: world.stats.parent_changes,
            outweighed: world.stats.outweighed,
            broken_links: world.stats.broken_links,
            placements_ok: world.tasks.iter().filter(|t| t.status == TaskStatus::Success).count() as u64,
            placements_failed: world.tasks.iter().filter(|t| t.failure_reason().is_some()).count() as u64,
            dead_devices: world.nodes.of_kind(NodeKind::EdgeDevice).filter(|n| n.is_dead()).count(),
        }
    }
}

/// Runs named scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of mist devices
    num_devices: usize,

    duration: f64,

    update_interval: f64,

    policy: WeightPolicy,

    /// Re-run every scenario and compare fingerprints
    replay: bool,
}

impl ScenarioRunner {
    pub fn new(seed: u64, num_devices: usize) -> Self {
        Self {
            seed,
            num_devices,
            duration: 300.0,
            update_interval: 1.0,
            policy: WeightPolicy::unweighted(),
            replay: true,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    pub fn with_update_interval(mut self, secs: f64) -> Self {
        self.update_interval = secs;
        self
    }

    pub fn with_policy(mut self, policy: WeightPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables or disables the second, fingerprint-comparing run.
    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay = replay;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Base configuration shared by every scenario.
    pub fn base_config(&self) -> SimConfig {
        SimConfig::default()
            .with_seed(self.seed)
            .with_devices(self.num_devices)
            .with_duration(self.duration)
            .with_update_interval(self.update_interval)
            .with_policy(self.policy)
    }

    /// Scenario-specific configuration.
    pub fn config(&self, scenario: ScenarioId) -> SimConfig {
        let base = self.base_config();
        match scenario {
            ScenarioId::ThreeNode => base.with_range(10.0).with_devices(3),
            ScenarioId::RandomWalk => base,
            ScenarioId::Highway => base
                .with_map(MapBounds::new(1000.0, 200.0))
                .with_mobility(MobilityParams::default().with_speed(5.0).with_pause(0.0, 0.0)),
            ScenarioId::BatteryDrain => {
                let status = self.duration / 10.0;
                base.with_status_interval(status)
            }
            ScenarioId::Sparse => base.with_map(MapBounds::new(5000.0, 5000.0)),
        }
    }

    /// Builds the world for `scenario` without running it.
    pub fn build(&self, scenario: ScenarioId) -> Result<SimWorld, SimError> {
        let config = self.config(scenario);
        config.validate()?;
        let nodes = match scenario {
            ScenarioId::ThreeNode => three_node_topology(&config)?,
            ScenarioId::RandomWalk => {
                standard_topology_with(&config, &[DeviceProfile::Smartphone, DeviceProfile::Laptop])?
            }
            ScenarioId::Highway => highway_topology(&config)?,
            ScenarioId::BatteryDrain => {
                let mut nodes = standard_topology_with(
                    &config,
                    &[DeviceProfile::Smartphone, DeviceProfile::Laptop, DeviceProfile::Sensor],
                )?;
                // 1 Wh emptied within a quarter of the run.
                let drain_w = 3600.0 / (config.duration / 4.0);
                for node in nodes.iter_mut().filter(|n| n.kind == NodeKind::EdgeDevice) {
                    node.power = PowerSource::Battery(Battery::new(1.0, 100.0, drain_w));
                }
                nodes
            }
            ScenarioId::Sparse => standard_topology(&config)?,
        };
        SimWorld::with_nodes(config, nodes)
    }

    /// Builds and runs `scenario` once.
    pub fn execute(&self, scenario: ScenarioId) -> Result<(SimWorld, RunSummary), SimError> {
        let mut sim = self.build(scenario)?;
        let summary = sim.run()?;
        Ok((sim, summary))
    }

    /// Runs a scenario and returns the result. Errors become failures.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        match self.try_run(scenario) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} (seed={}) aborted: {}", scenario.name(), self.seed, e);
                ScenarioResult::errored(scenario, self.seed, e)
            }
        }
    }

    fn try_run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        let (sim, summary) = self.execute(scenario)?;
        let mut result = self.evaluate(scenario, &sim, &summary);

        if self.replay {
            let world = sim.world();
            let mut failures = Vec::new();
            let (again, replay) = self.execute(scenario)?;
            if replay.fingerprint != summary.fingerprint {
                failures.push(format!(
                    "replay fingerprint {:016x} differs from {:016x}",
                    replay.fingerprint, summary.fingerprint
                ));
            }
            if again.world().snapshots != world.snapshots || again.world().tasks != world.tasks {
                failures.push("replay produced different clusters or placements".to_string());
            }
            if !failures.is_empty() {
                result.passed = false;
                let mut reasons: Vec<String> = result.failure_reason.take().into_iter().collect();
                reasons.extend(failures);
                result.failure_reason = Some(reasons.join("; "));
            }
        }

        Ok(result)
    }

    /// Checks one finished run without replaying it.
    pub fn evaluate(&self, scenario: ScenarioId, sim: &SimWorld, summary: &RunSummary) -> ScenarioResult {
        let world = sim.world();
        let mut failures = common_checks(world, summary);
        failures.extend(self.scenario_checks(scenario, sim));

        let metrics = ScenarioMetrics::collect(world, summary, sim.simulation().kernel().max_pending());
        debug!("{} metrics: {:?}", scenario.name(), metrics);

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failures.is_empty(),
            final_time_secs: summary.final_time,
            fingerprint: summary.fingerprint,
            failure_reason: (!failures.is_empty()).then(|| failures.join("; ")),
            metrics,
        }
    }

    fn scenario_checks(&self, scenario: ScenarioId, sim: &SimWorld) -> Vec<String> {
        let world = sim.world();
        let mut failures = Vec::new();
        match scenario {
            ScenarioId::ThreeNode => {
                // Devices are ids 1..=3 after the cloud.
                let expected = [(1, 2), (2, 2), (3, 3)];
                for (node, root) in expected {
                    match world.orchestrator_of(NodeId(node)) {
                        Ok(found) if found == NodeId(root) => {}
                        other => failures.push(format!("N{} orchestrator {:?}, expected N{}", node, other, root)),
                    }
                }
            }
            ScenarioId::RandomWalk => {
                if world.stats.updates == 0 && self.duration >= 1.0 && self.num_devices > 0 {
                    failures.push("no cluster update ran".to_string());
                }
            }
            ScenarioId::Highway => {
                let devices = world.nodes.edge_devices();
                let t = self.duration.min(30.0);
                for id in &devices {
                    if let Ok(node) = world.nodes.get(*id) {
                        if node.location_at(t).x <= node.mobility.start().x {
                            failures.push(format!("{} did not advance along the highway", id));
                        }
                    }
                }
                let clustered = world.snapshots.iter().any(|s| s.cluster_count() < s.nodes.len());
                if devices.len() >= 2 && self.duration >= 1.0 && !clustered {
                    failures.push("convoy never formed a cluster".to_string());
                }
            }
            ScenarioId::BatteryDrain => {
                let all_dead = |s: &&ClusterSnapshot| s.nodes.iter().all(|n| n.battery == Some(0.0));
                match world.snapshots.iter().find(all_dead) {
                    None => failures.push("batteries never emptied".to_string()),
                    Some(snap) => {
                        let t_dead = snap.time;
                        let generated = world
                            .tasks
                            .iter()
                            .filter(|t| t.created > t_dead)
                            .filter(|t| t.failure_reason() != Some(FailureReason::NotGeneratedDeviceDead))
                            .count();
                        if generated > 0 {
                            failures.push(format!("{} tasks generated by dead devices after t={}", generated, t_dead));
                        }
                    }
                }
            }
            ScenarioId::Sparse => {
                if let Some(last) = world.snapshots.last() {
                    if last.cluster_count() * 2 < last.nodes.len() {
                        failures.push(format!(
                            "{} clusters for {} scattered devices",
                            last.cluster_count(),
                            last.nodes.len()
                        ));
                    }
                }
            }
        }
        failures
    }
}

/// Assertions every scenario must satisfy.
fn common_checks(world: &World, summary: &RunSummary) -> Vec<String> {
    let mut failures = Vec::new();
    if world.snapshots.is_empty() {
        failures.push("no cluster snapshot recorded".to_string());
    }
    if let Some(bad) = world.snapshots.iter().find(|s| !s.is_consistent()) {
        failures.push(format!("inconsistent cluster forest at t={}", bad.time));
    }
    if let Err(e) = world.clusters.check_forest() {
        failures.push(e.to_string());
    }
    if summary.unhandled_events > 0 {
        failures.push(format!("{} unhandled events", summary.unhandled_events));
    }
    failures
}

/// Cloud, then three stationary mains-powered devices at (0,0), (5,0), (50,0).
fn three_node_topology(config: &SimConfig) -> Result<NodeTable, SimError> {
    let mut factory = NodeFactory::new(config.seeds(), config.mobility);
    factory.cloud(config.map.center())?;
    let devices = [(0.0, 1_000.0), (5.0, 100_000.0), (50.0, 1_000.0)];
    for (x, mips) in devices {
        let id = factory.next_id();
        factory.push(
            ComputingNode::new(id, NodeKind::EdgeDevice, DeviceProfile::RaspberryPi.name(), Location::new(x, 0.0))
                .with_compute(1, mips),
        )?;
    }
    Ok(factory.finish(config)?)
}

/// A convoy of smartphones along the map's horizontal midline, heading
/// for the far end.
fn highway_topology(config: &SimConfig) -> Result<NodeTable, SimError> {
    let mut factory = NodeFactory::new(config.seeds(), config.mobility);
    factory.cloud(config.map.center())?;
    for loc in datacenter_grid(&config.map, config.num_datacenters) {
        factory.datacenter(loc)?;
    }

    let lane = config.map.width / 2.0;
    let exit = Location::new(config.map.length * 0.9, lane);
    let spacing = (config.cluster_range / 4.0).min(config.map.length * 0.4 / config.num_devices.max(1) as f64);
    for i in 0..config.num_devices {
        let start = Location::new(10.0 + i as f64 * spacing, lane);
        factory.device(DeviceProfile::Smartphone, start, 100.0, Waypoints::new([exit]))?;
    }
    Ok(factory.finish(config)?)
}
