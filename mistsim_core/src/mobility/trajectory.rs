//! Precomputed per-node paths, indexed by integer milliseconds.

use mistsim_env::{Location, NodeId};
use serde::{Deserialize, Serialize};

use super::params::MapBounds;

/// Converts seconds to whole milliseconds, rounding to the nearest one.
///
/// Rounding (not truncation) keeps `0.1 * 3` and `0.3` on the same sample.
pub fn to_millis(seconds: f64) -> u64 {
    if !(seconds > 0.0) {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

/// Everything `generate_path` needs to know about the run.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlan {
    /// Simulation horizon in seconds.
    pub duration: f64,

    /// Sampling step in seconds.
    pub update_interval: f64,

    pub bounds: MapBounds,

    /// Peripheral edge datacenters a node may attach to.
    pub facilities: Vec<(NodeId, Location)>,

    /// Coverage radius of each facility.
    pub facility_range: f64,
}

impl PathPlan {
    pub fn new(duration: f64, update_interval: f64, bounds: MapBounds) -> Self {
        Self {
            duration,
            update_interval,
            bounds,
            facilities: Vec::new(),
            facility_range: 0.0,
        }
    }

    pub fn with_facilities(mut self, facilities: Vec<(NodeId, Location)>, range: f64) -> Self {
        self.facilities = facilities;
        self.facility_range = range;
        self
    }

    /// Sampling step in milliseconds, never zero.
    pub fn step_ms(&self) -> u64 {
        to_millis(self.update_interval).max(1)
    }

    pub fn horizon_ms(&self) -> u64 {
        to_millis(self.duration)
    }

    /// Nearest facility within range of `loc`. Ties keep the first listed.
    pub fn closest_facility(&self, loc: &Location) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (id, site) in &self.facilities {
            let d = loc.distance_to(site);
            if d > self.facility_range {
                continue;
            }
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((*id, d)),
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Sampled locations and attached facilities of one node.
///
/// Sample `k` holds the state at `k * step_ms` milliseconds. Queries past
/// the last sample clamp to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    step_ms: u64,
    locations: Vec<Location>,
    facilities: Vec<Option<NodeId>>,
}

impl Trajectory {
    /// A single-sample trajectory for a node that never moves.
    pub fn fixed(location: Location, facility: Option<NodeId>, step_ms: u64) -> Self {
        Self {
            step_ms: step_ms.max(1),
            locations: vec![location],
            facilities: vec![facility],
        }
    }

    pub(crate) fn with_capacity(step_ms: u64, samples: usize) -> Self {
        Self {
            step_ms: step_ms.max(1),
            locations: Vec::with_capacity(samples),
            facilities: Vec::with_capacity(samples),
        }
    }

    pub(crate) fn push(&mut self, location: Location, facility: Option<NodeId>) {
        self.locations.push(location);
        self.facilities.push(facility);
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    fn sample_index(&self, time: f64) -> usize {
        let k = (to_millis(time) / self.step_ms) as usize;
        k.min(self.locations.len().saturating_sub(1))
    }

    /// Location at `time` seconds, or `None` for an empty trajectory.
    pub fn location_at(&self, time: f64) -> Option<Location> {
        self.locations.get(self.sample_index(time)).copied()
    }

    /// Attached facility at `time` seconds.
    pub fn facility_at(&self, time: f64) -> Option<NodeId> {
        self.facilities.get(self.sample_index(time)).copied().flatten()
    }

    /// `(millis, location)` pairs in time order.
    pub fn samples(&self) -> impl Iterator<Item = (u64, &Location)> + '_ {
        let step = self.step_ms;
        self.locations
            .iter()
            .enumerate()
            .map(move |(k, loc)| (k as u64 * step, loc))
    }
}
