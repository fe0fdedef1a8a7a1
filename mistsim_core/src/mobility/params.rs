//! Map bounds and per-node mobility parameters.

use mistsim_env::{EnvError, Location};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// The rectangular simulation area `[0, length] x [0, width]`, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Extent along x.
    pub length: f64,

    /// Extent along y.
    pub width: f64,
}

impl MapBounds {
    pub fn new(length: f64, width: f64) -> Self {
        Self { length, width }
    }

    /// Returns true if `loc` lies inside the map, edges included.
    pub fn contains(&self, loc: &Location) -> bool {
        (0.0..=self.length).contains(&loc.x) && (0.0..=self.width).contains(&loc.y)
    }

    /// Returns true if `loc` is on or beyond any edge.
    pub fn at_edge(&self, loc: &Location) -> bool {
        loc.x <= 0.0 || loc.x >= self.length || loc.y <= 0.0 || loc.y >= self.width
    }

    /// Uniformly random point inside the map.
    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Location {
        let x = Uniform::new_inclusive(0.0, self.length.max(0.0)).sample(rng);
        let y = Uniform::new_inclusive(0.0, self.width.max(0.0)).sample(rng);
        Location::new(x, y)
    }

    pub fn center(&self) -> Location {
        Location::new(self.length / 2.0, self.width / 2.0)
    }
}

impl Default for MapBounds {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

/// Speed and phase-duration ranges for a mobile node.
///
/// All durations are in seconds; speed is in meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobilityParams {
    pub speed: f64,

    pub min_pause: f64,
    pub max_pause: f64,

    pub min_mobility: f64,
    pub max_mobility: f64,
}

impl Default for MobilityParams {
    fn default() -> Self {
        Self {
            speed: 1.4,
            min_pause: 60.0,
            max_pause: 180.0,
            min_mobility: 60.0,
            max_mobility: 300.0,
        }
    }
}

impl MobilityParams {
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_pause(mut self, min: f64, max: f64) -> Self {
        self.min_pause = min;
        self.max_pause = max;
        self
    }

    pub fn with_mobility(mut self, min: f64, max: f64) -> Self {
        self.min_mobility = min;
        self.max_mobility = max;
        self
    }

    /// Rejects negative values and inverted ranges.
    pub fn validate(&self) -> Result<(), EnvError> {
        if !(self.speed >= 0.0) {
            return Err(EnvError::invalid(format!("speed must be >= 0, got {}", self.speed)));
        }
        if !(self.min_pause >= 0.0 && self.min_pause <= self.max_pause) {
            return Err(EnvError::invalid(format!(
                "pause range [{}, {}] is invalid",
                self.min_pause, self.max_pause
            )));
        }
        if !(self.min_mobility >= 0.0 && self.min_mobility <= self.max_mobility) {
            return Err(EnvError::invalid(format!(
                "mobility range [{}, {}] is invalid",
                self.min_mobility, self.max_mobility
            )));
        }
        Ok(())
    }

    pub(crate) fn draw_pause<R: Rng>(&self, rng: &mut R) -> f64 {
        draw_between(rng, self.min_pause, self.max_pause)
    }

    pub(crate) fn draw_mobility<R: Rng>(&self, rng: &mut R) -> f64 {
        draw_between(rng, self.min_mobility, self.max_mobility)
    }
}

/// Uniform draw from `[min, max]`; collapses to `min` on an empty range.
fn draw_between<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    Uniform::new_inclusive(min, max).sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_edges() {
        let map = MapBounds::new(100.0, 50.0);
        assert!(map.at_edge(&Location::new(0.0, 10.0)));
        assert!(map.at_edge(&Location::new(10.0, 50.0)));
        assert!(map.at_edge(&Location::new(120.0, 10.0)));
        assert!(!map.at_edge(&Location::new(10.0, 10.0)));
        assert!(!map.contains(&Location::new(120.0, 10.0)));
    }

    #[test]
    fn test_random_point_inside() {
        let map = MapBounds::new(100.0, 50.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(map.contains(&map.random_point(&mut rng)));
        }
    }

    #[test]
    fn test_draws_stay_in_range() {
        let params = MobilityParams::default().with_pause(5.0, 10.0).with_mobility(2.0, 2.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let p = params.draw_pause(&mut rng);
            assert!((5.0..=10.0).contains(&p));
            assert_eq!(params.draw_mobility(&mut rng), 2.0);
        }
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        assert!(MobilityParams::default().validate().is_ok());
        assert!(MobilityParams::default().with_pause(10.0, 5.0).validate().is_err());
        assert!(MobilityParams::default().with_speed(-1.0).validate().is_err());
    }
}
