//! Common types shared by every mistsim crate.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Identifier of a computing node (cloud, edge datacenter or edge device).
///
/// Ids are dense: the topology layer hands them out sequentially from zero,
/// so they double as indexes into node tables and cluster arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Creates a NodeId from its raw index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as a `usize` index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// The computing tier a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Remote cloud datacenter (always reachable, never mobile).
    Cloud,

    /// Edge datacenter with a limited coverage radius.
    EdgeDatacenter,

    /// Mist / end device: the nodes that move and form clusters.
    EdgeDevice,
}

impl NodeKind {
    /// Returns the tier name used in logs and exports.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Cloud => "cloud",
            NodeKind::EdgeDatacenter => "edge",
            NodeKind::EdgeDevice => "mist",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A point on the simulation map, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    /// Map origin.
    pub const ORIGIN: Location = Location { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the location as a nalgebra vector.
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Builds a location from a nalgebra vector.
    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }

    /// Euclidean distance to another location.
    pub fn distance_to(&self, other: &Location) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }

    /// Heading towards `other` in degrees, normalized to `[0, 360)`.
    pub fn heading_to(&self, other: &Location) -> f64 {
        let delta = other.to_vector() - self.to_vector();
        delta.y.atan2(delta.x).to_degrees().rem_euclid(360.0)
    }

    /// Moves `distance` meters along `heading_deg`.
    pub fn step(&self, heading_deg: f64, distance: f64) -> Location {
        let rad = heading_deg.to_radians();
        Location::from_vector(self.to_vector() + Vector2::new(rad.cos(), rad.sin()) * distance)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}
