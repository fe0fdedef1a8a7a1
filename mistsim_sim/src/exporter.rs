//! JSON exporter for cluster snapshots.
//!
//! One frame per recorded snapshot, suitable for plotting cluster maps
//! offline.

use mistsim_core::{ClusterSnapshot, NodeState, World};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use crate::error::SimError;
use crate::runner::ScenarioMetrics;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub nodes: Vec<NodeFrame>,

    /// Ids of the cluster roots
    pub orchestrators: Vec<u32>,
}

impl From<&ClusterSnapshot> for SimFrame {
    fn from(snapshot: &ClusterSnapshot) -> Self {
        Self {
            time_sec: snapshot.time,
            nodes: snapshot.nodes.iter().map(NodeFrame::from).collect(),
            orchestrators: snapshot.orchestrators.iter().map(|id| id.raw()).collect(),
        }
    }
}

/// One device in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFrame {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub parent: u32,
    pub orchestrator: u32,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
}

impl NodeFrame {
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<&NodeState> for NodeFrame {
    fn from(state: &NodeState) -> Self {
        Self {
            id: state.id.raw(),
            x: state.x,
            y: state.y,
            parent: state.parent.raw(),
            orchestrator: state.orchestrator.raw(),
            weight: state.weight,
            battery: state.battery,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Weight policy name
    pub policy: String,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ScenarioMetrics>,
}

impl SimExport {
    pub fn new(scenario: &str, seed: u64, policy: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            policy: policy.to_string(),
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            metrics: None,
        }
    }

    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Adds one frame per snapshot recorded in `world`.
    pub fn add_world(&mut self, world: &World) {
        for snapshot in &world.snapshots {
            self.add_frame(SimFrame::from(snapshot));
        }
    }

    pub fn finalize(&mut self, passed: bool, metrics: Option<ScenarioMetrics>) {
        self.passed = passed;
        self.metrics = metrics;
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
