//! Per-step movement rules: scripted waypoints with a random-walk fallback.

use std::collections::VecDeque;

use mistsim_env::Location;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::params::{MapBounds, MobilityParams};

/// Scripted "custom movement": points visited in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoints {
    points: VecDeque<Location>,
}

impl Waypoints {
    pub fn new(points: impl IntoIterator<Item = Location>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// The waypoint currently being approached.
    pub fn peek(&self) -> Option<&Location> {
        self.points.front()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Moves from `current` towards the next waypoint by at most `distance`.
    ///
    /// Snaps onto the waypoint (and pops it) when it is within one step.
    /// Returns `None` once every waypoint has been consumed.
    pub(crate) fn advance(&mut self, current: Location, distance: f64) -> Option<(Location, f64)> {
        let target = *self.points.front()?;
        let heading = current.heading_to(&target);
        if current.distance_to(&target) <= distance {
            self.points.pop_front();
            return Some((target, heading));
        }
        Some((current.step(heading, distance), heading))
    }
}

/// Mobility/pause phase machine with a map-edge heuristic.
///
/// Inside the map the node keeps its heading; on or beyond an edge it draws
/// a new heading biased back towards the interior. Each pause re-draws the
/// heading, the pause length and the next mobility length.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    params: MobilityParams,
    bounds: MapBounds,
    rng: ChaCha8Rng,

    /// Current heading in degrees.
    heading: f64,

    paused: bool,
    pause_left: f64,
    mobility_left: f64,
}

impl RandomWalk {
    pub fn new(params: MobilityParams, bounds: MapBounds, mut rng: ChaCha8Rng) -> Self {
        let heading = Uniform::new(0.0, 360.0).sample(&mut rng);
        let mobility_left = params.draw_mobility(&mut rng);
        Self {
            params,
            bounds,
            rng,
            heading,
            paused: false,
            pause_left: 0.0,
            mobility_left,
        }
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Computes the location one `dt` after `current`.
    pub fn next_location(&mut self, current: Location, dt: f64, waypoints: &mut Waypoints) -> Location {
        if self.paused {
            if self.pause_left > 0.0 {
                self.pause_left -= dt;
                return current;
            }
            self.paused = false;
        }

        if self.mobility_left <= 0.0 {
            let pause = self.params.draw_pause(&mut self.rng);
            self.heading = Uniform::new(0.0, 360.0).sample(&mut self.rng);
            self.mobility_left = self.params.draw_mobility(&mut self.rng);
            if pause > 0.0 {
                self.paused = true;
                self.pause_left = pause - dt;
                return current;
            }
        }

        self.mobility_left -= dt;
        let distance = self.params.speed * dt;
        if let Some((next, heading)) = waypoints.advance(current, distance) {
            self.heading = heading;
            return next;
        }
        if self.bounds.at_edge(&current) {
            self.heading = self.edge_heading(&current);
        }
        current.step(self.heading, distance)
    }

    /// A heading pointing back into the map. At corners the top or bottom
    /// edge decides.
    fn edge_heading(&mut self, loc: &Location) -> f64 {
        let r = self.rng.gen_range(0..180) as f64;
        let mut angle = self.heading;
        if loc.x >= self.bounds.length {
            angle = -90.0 - r;
        } else if loc.x <= 0.0 {
            angle = -90.0 + r;
        }
        if loc.y >= self.bounds.width {
            angle = -r;
        } else if loc.y <= 0.0 {
            angle = r;
        }
        angle.rem_euclid(360.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn walk(params: MobilityParams, seed: u64) -> RandomWalk {
        RandomWalk::new(params, MapBounds::new(100.0, 100.0), ChaCha8Rng::seed_from_u64(seed))
    }

    #[test]
    fn test_waypoints_snap_and_pop() {
        let mut wp = Waypoints::new([Location::new(10.0, 0.0), Location::new(10.0, 10.0)]);
        let (loc, heading) = wp.advance(Location::ORIGIN, 4.0).unwrap();
        assert_relative_eq!(loc.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(heading, 0.0, epsilon = 1e-9);

        let (loc, _) = wp.advance(Location::new(8.0, 0.0), 4.0).unwrap();
        assert_eq!(loc, Location::new(10.0, 0.0));
        assert_eq!(wp.len(), 1);

        let (_, heading) = wp.advance(loc, 4.0).unwrap();
        assert_relative_eq!(heading, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_waypoints_yield_none() {
        let mut wp = Waypoints::default();
        assert!(wp.advance(Location::ORIGIN, 1.0).is_none());
    }

    #[test]
    fn test_moves_speed_times_interval() {
        let params = MobilityParams::default().with_speed(2.0).with_mobility(100.0, 100.0);
        let mut w = walk(params, 1);
        let start = Location::new(50.0, 50.0);
        let next = w.next_location(start, 0.5, &mut Waypoints::default());
        assert_relative_eq!(start.distance_to(&next), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pause_freezes_position() {
        let params = MobilityParams::default()
            .with_speed(1.0)
            .with_mobility(1.0, 1.0)
            .with_pause(3.0, 3.0);
        let mut w = walk(params, 2);
        let mut wp = Waypoints::default();
        let mut loc = Location::new(50.0, 50.0);

        loc = w.next_location(loc, 1.0, &mut wp); // moving
        let frozen = w.next_location(loc, 1.0, &mut wp); // pause starts
        assert!(w.is_paused());
        assert_eq!(frozen, loc);
        assert_eq!(w.next_location(frozen, 1.0, &mut wp), frozen);
        assert_eq!(w.next_location(frozen, 1.0, &mut wp), frozen);
        let moved = w.next_location(frozen, 1.0, &mut wp);
        assert!(!w.is_paused());
        assert_ne!(moved, frozen);
    }

    #[test]
    fn test_edge_heading_points_inwards() {
        let params = MobilityParams::default().with_mobility(1000.0, 1000.0);
        for seed in 0..20 {
            let mut w = walk(params, seed);
            let mut wp = Waypoints::default();
            // bottom edge
            let next = w.next_location(Location::new(50.0, 0.0), 1.0, &mut wp);
            assert!(next.y >= 0.0, "seed {} moved to {}", seed, next);
            // right edge
            let next = w.next_location(Location::new(100.0, 50.0), 1.0, &mut wp);
            assert!(next.x <= 100.0, "seed {} moved to {}", seed, next);
        }
    }

    #[test]
    fn test_waypoints_override_heading() {
        let params = MobilityParams::default().with_speed(1.0).with_mobility(1000.0, 1000.0);
        let mut w = walk(params, 4);
        let mut wp = Waypoints::new([Location::new(50.0, 60.0)]);
        let next = w.next_location(Location::new(50.0, 50.0), 1.0, &mut wp);
        assert_relative_eq!(next.y, 51.0, epsilon = 1e-9);
        assert_relative_eq!(w.heading(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_corner_heading_follows_horizontal_edge() {
        for seed in 0..32 {
            let mut w = walk(MobilityParams::default(), seed);
            // bottom-right corner: points up
            let up = w.edge_heading(&Location::new(100.0, 0.0));
            assert!((0.0..180.0).contains(&up), "seed {} heading {}", seed, up);
            // top-left corner: points down
            let down = w.edge_heading(&Location::new(0.0, 100.0));
            assert!(down == 0.0 || down > 180.0, "seed {} heading {}", seed, down);
        }
    }
}
