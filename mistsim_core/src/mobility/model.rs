//! Per-node location oracle.

use mistsim_env::{Location, NodeId};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::params::MobilityParams;
use super::trajectory::{PathPlan, Trajectory};
use super::walk::{RandomWalk, Waypoints};
use crate::error::CoreError;

/// How a node moves before its path is generated.
#[derive(Debug, Clone)]
enum Motion {
    Stationary,
    Mobile {
        params: MobilityParams,
        waypoints: Waypoints,
        rng: ChaCha8Rng,
    },
}

/// Trajectory generator and location oracle for one node.
///
/// Built at setup, `generate_path` runs exactly once, then every query is
/// an O(1) lookup that never mutates the model.
#[derive(Debug, Clone)]
pub struct MobilityModel {
    node: NodeId,
    start: Location,
    mobile: bool,
    motion: Option<Motion>,
    trajectory: Option<Trajectory>,
}

impl MobilityModel {
    /// A node that stays at `location` for the whole run.
    pub fn stationary(node: NodeId, location: Location) -> Self {
        Self {
            node,
            start: location,
            mobile: false,
            motion: Some(Motion::Stationary),
            trajectory: None,
        }
    }

    /// A mobile node starting at `start`.
    ///
    /// With non-empty `waypoints` the node follows them first; afterwards,
    /// or without any, it random-walks using `rng`.
    pub fn mobile(
        node: NodeId,
        start: Location,
        params: MobilityParams,
        waypoints: Waypoints,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            node,
            start,
            mobile: true,
            motion: Some(Motion::Mobile {
                params,
                waypoints,
                rng,
            }),
            trajectory: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    pub fn start(&self) -> Location {
        self.start
    }

    pub fn is_generated(&self) -> bool {
        self.trajectory.is_some()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    /// Precomputes the path from `0` to `plan.duration` in `plan.update_interval`
    /// steps, recording the closest in-range facility at every sample.
    ///
    /// Fails with `AlreadyGenerated` on a second call.
    pub fn generate_path(&mut self, plan: &PathPlan) -> Result<(), CoreError> {
        let motion = self.motion.take().ok_or(CoreError::AlreadyGenerated(self.node))?;
        let step_ms = plan.step_ms();

        let trajectory = match motion {
            Motion::Stationary => {
                Trajectory::fixed(self.start, plan.closest_facility(&self.start), step_ms)
            }
            Motion::Mobile {
                params,
                mut waypoints,
                rng,
            } => {
                let samples = (plan.horizon_ms() / step_ms) as usize + 1;
                let dt = step_ms as f64 / 1000.0;
                let mut walk = RandomWalk::new(params, plan.bounds, rng);
                let mut trajectory = Trajectory::with_capacity(step_ms, samples);
                let mut location = self.start;
                for _ in 0..samples {
                    trajectory.push(location, plan.closest_facility(&location));
                    location = walk.next_location(location, dt, &mut waypoints);
                }
                trajectory
            }
        };

        debug!(
            "generated path for {} ({} samples, step {} ms)",
            self.node,
            trajectory.len(),
            step_ms
        );
        self.trajectory = Some(trajectory);
        Ok(())
    }

    /// Location at `time` seconds.
    ///
    /// Stationary nodes return their fixed location. A mobile node queried
    /// before `generate_path` reports its start location.
    pub fn location_at(&self, time: f64) -> Location {
        if !self.mobile {
            return self.start;
        }
        self.trajectory
            .as_ref()
            .and_then(|t| t.location_at(time))
            .unwrap_or(self.start)
    }

    /// Closest in-range peripheral facility at `time` seconds.
    pub fn closest_facility(&self, time: f64) -> Option<NodeId> {
        self.trajectory.as_ref().and_then(|t| t.facility_at(time))
    }

    /// Euclidean distance between two locations.
    pub fn distance(a: &Location, b: &Location) -> f64 {
        a.distance_to(b)
    }

    /// Distance between this node and `other` at `time`.
    pub fn distance_at(&self, other: &MobilityModel, time: f64) -> f64 {
        Self::distance(&self.location_at(time), &other.location_at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    use crate::mobility::MapBounds;

    fn plan() -> PathPlan {
        PathPlan::new(100.0, 1.0, MapBounds::new(200.0, 200.0))
    }

    fn walker(seed: u64, waypoints: Waypoints) -> MobilityModel {
        MobilityModel::mobile(
            NodeId(1),
            Location::new(100.0, 100.0),
            MobilityParams::default().with_speed(1.0),
            waypoints,
            ChaCha8Rng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_generate_twice_fails() {
        let mut m = walker(1, Waypoints::default());
        m.generate_path(&plan()).unwrap();
        assert_eq!(
            m.generate_path(&plan()),
            Err(CoreError::AlreadyGenerated(NodeId(1)))
        );

        let mut s = MobilityModel::stationary(NodeId(2), Location::ORIGIN);
        s.generate_path(&plan()).unwrap();
        assert!(s.generate_path(&plan()).is_err());
    }

    #[test]
    fn test_sample_count_covers_horizon() {
        let mut m = walker(1, Waypoints::default());
        m.generate_path(&plan()).unwrap();
        // 0, 1, ..., 100 seconds inclusive
        assert_eq!(m.trajectory().map(|t| t.len()), Some(101));
        assert_eq!(m.location_at(0.0), Location::new(100.0, 100.0));
    }

    #[test]
    fn test_location_queries_are_pure() {
        let mut m = walker(7, Waypoints::default());
        m.generate_path(&plan()).unwrap();
        for t in [0.0, 3.5, 42.0, 100.0, 250.0] {
            assert_eq!(m.location_at(t), m.location_at(t));
        }
        assert_eq!(m.location_at(250.0), m.location_at(100.0));
    }

    #[test]
    fn test_same_seed_same_path() {
        let mut a = walker(11, Waypoints::default());
        let mut b = walker(11, Waypoints::default());
        a.generate_path(&plan()).unwrap();
        b.generate_path(&plan()).unwrap();
        assert_eq!(a.trajectory(), b.trajectory());

        let mut c = walker(12, Waypoints::default());
        c.generate_path(&plan()).unwrap();
        assert_ne!(a.trajectory(), c.trajectory());
    }

    #[test]
    fn test_stationary_ignores_time() {
        let mut s = MobilityModel::stationary(NodeId(0), Location::new(5.0, 5.0));
        assert_eq!(s.location_at(30.0), Location::new(5.0, 5.0));
        s.generate_path(&plan()).unwrap();
        assert_eq!(s.location_at(1.0e6), Location::new(5.0, 5.0));
    }

    #[test]
    fn test_waypoint_path() {
        let mut m = MobilityModel::mobile(
            NodeId(3),
            Location::new(10.0, 10.0),
            MobilityParams::default().with_speed(2.0).with_mobility(1000.0, 1000.0),
            Waypoints::new([Location::new(20.0, 10.0)]),
            ChaCha8Rng::seed_from_u64(0),
        );
        m.generate_path(&plan()).unwrap();
        assert_relative_eq!(m.location_at(1.0).x, 12.0, epsilon = 1e-9);
        assert_relative_eq!(m.location_at(3.0).x, 16.0, epsilon = 1e-9);
        assert_eq!(m.location_at(5.0), Location::new(20.0, 10.0));
    }

    #[test]
    fn test_closest_facility_follows_path() {
        let plan = plan().with_facilities(
            vec![
                (NodeId(10), Location::new(10.0, 10.0)),
                (NodeId(11), Location::new(30.0, 10.0)),
            ],
            6.0,
        );
        let mut m = MobilityModel::mobile(
            NodeId(3),
            Location::new(10.0, 10.0),
            MobilityParams::default().with_speed(2.0).with_mobility(1000.0, 1000.0),
            Waypoints::new([Location::new(30.0, 10.0)]),
            ChaCha8Rng::seed_from_u64(0),
        );
        m.generate_path(&plan).unwrap();
        assert_eq!(m.closest_facility(0.0), Some(NodeId(10)));
        assert_eq!(m.closest_facility(5.0), None);
        assert_eq!(m.closest_facility(10.0), Some(NodeId(11)));
    }

    #[test]
    fn test_distance_between_models() {
        let a = MobilityModel::stationary(NodeId(0), Location::new(0.0, 0.0));
        let b = MobilityModel::stationary(NodeId(1), Location::new(6.0, 8.0));
        assert_relative_eq!(a.distance_at(&b, 0.0), 10.0);
    }
}
