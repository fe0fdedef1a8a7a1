//! Node weight: how desirable a node is as an orchestrator.
//!
//! ```text
//! weight = c_cap  * (mips_per_core / normalizer) / max(neighbors, 1)
//!        + c_nbr  * neighbors
//!        + c_pred * predicted_neighbors
//!        + c_dist * avg_neighbor_distance / range
//!        + c_batt * battery_factor
//! ```
//!
//! `battery_factor` is the charge fraction for battery nodes and a fixed
//! ceiling for mains-powered ones.

use serde::{Deserialize, Serialize};

/// Coefficients and constants of the weight formula, plus the per-hop
/// attenuation used when comparing against other clusters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightPolicy {
    pub name: &'static str,

    pub capacity: f64,
    pub neighbors: f64,
    pub predicted: f64,
    pub distance: f64,
    pub battery: f64,

    /// Divides per-core MIPS before it enters the formula.
    pub capacity_normalizer: f64,

    /// Battery factor for mains-powered nodes.
    pub mains_ceiling: f64,

    /// Fraction of a root's weight lost per hop.
    pub weight_drop: f64,
}

impl WeightPolicy {
    /// Plain sum of the five terms, battery counted twice.
    pub fn unweighted() -> Self {
        Self {
            name: "unweighted",
            capacity: 1.0,
            neighbors: 1.0,
            predicted: 1.0,
            distance: 1.0,
            battery: 2.0,
            capacity_normalizer: 200_000.0,
            mains_ceiling: 2.0,
            weight_drop: 0.2,
        }
    }

    /// 0.4 / 0.1 / 0.1 / 0.2 / 0.2 weighted sum with a steeper per-hop drop.
    pub fn coefficiented() -> Self {
        Self {
            name: "coefficiented",
            capacity: 0.4,
            neighbors: 0.1,
            predicted: 0.1,
            distance: 0.2,
            battery: 0.2,
            capacity_normalizer: 200_000.0,
            mains_ceiling: 1.0,
            weight_drop: 0.5,
        }
    }

    pub fn all() -> [WeightPolicy; 2] {
        [Self::unweighted(), Self::coefficiented()]
    }

    /// Looks a preset up by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.name == name)
    }

    pub fn with_weight_drop(mut self, drop: f64) -> Self {
        self.weight_drop = drop;
        self
    }

    /// Multiplier applied to a root's weight `depth` hops away.
    pub fn decay(&self, depth: usize) -> f64 {
        (1.0 - self.weight_drop).powi(depth as i32)
    }

    /// Combines raw inputs into a weight.
    pub fn evaluate(&self, inputs: &WeightInputs) -> WeightBreakdown {
        let divisor = inputs.neighbors.max(1) as f64;
        let capacity_term = inputs.mips_per_core / self.capacity_normalizer / divisor;
        let distance_term = if inputs.range > 0.0 {
            inputs.avg_distance / inputs.range
        } else {
            0.0
        };
        let battery_factor = match inputs.battery_percentage {
            Some(pct) => pct.clamp(0.0, 100.0) / 100.0,
            None => self.mains_ceiling,
        };

        let total = self.capacity * capacity_term
            + self.neighbors * inputs.neighbors as f64
            + self.predicted * inputs.predicted_neighbors as f64
            + self.distance * distance_term
            + self.battery * battery_factor;

        WeightBreakdown {
            capacity_term,
            neighbors: inputs.neighbors,
            predicted_neighbors: inputs.predicted_neighbors,
            distance_term,
            battery_factor,
            total,
        }
    }
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self::unweighted()
    }
}

/// Raw signals gathered for one node at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightInputs {
    pub mips_per_core: f64,
    pub neighbors: usize,
    pub predicted_neighbors: usize,

    /// Mean distance to current neighbors; zero without neighbors.
    pub avg_distance: f64,

    /// Connectivity range the distance is normalized by.
    pub range: f64,

    /// `None` for mains-powered nodes.
    pub battery_percentage: Option<f64>,
}

/// Each term of a computed weight, before coefficients, and the total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBreakdown {
    pub capacity_term: f64,
    pub neighbors: usize,
    pub predicted_neighbors: usize,
    pub distance_term: f64,
    pub battery_factor: f64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inputs() -> WeightInputs {
        WeightInputs {
            mips_per_core: 100_000.0,
            neighbors: 2,
            predicted_neighbors: 3,
            avg_distance: 5.0,
            range: 10.0,
            battery_percentage: Some(40.0),
        }
    }

    #[test]
    fn test_unweighted_sum() {
        let w = WeightPolicy::unweighted().evaluate(&inputs());
        assert_relative_eq!(w.capacity_term, 0.25);
        assert_relative_eq!(w.distance_term, 0.5);
        assert_relative_eq!(w.battery_factor, 0.4);
        // 0.25 + 2 + 3 + 0.5 + 2 * 0.4
        assert_relative_eq!(w.total, 6.55, epsilon = 1e-12);
    }

    #[test]
    fn test_coefficiented_sum() {
        let w = WeightPolicy::coefficiented().evaluate(&inputs());
        // 0.4*0.25 + 0.1*2 + 0.1*3 + 0.2*0.5 + 0.2*0.4
        assert_relative_eq!(w.total, 0.78, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_neighbors_divides_by_one() {
        let lonely = WeightInputs {
            neighbors: 0,
            predicted_neighbors: 0,
            avg_distance: 0.0,
            battery_percentage: None,
            ..inputs()
        };
        let w = WeightPolicy::unweighted().evaluate(&lonely);
        assert_relative_eq!(w.capacity_term, 0.5);
        assert_relative_eq!(w.battery_factor, 2.0);
        assert_relative_eq!(w.total, 4.5);
        assert!(w.total.is_finite());
    }

    #[test]
    fn test_dead_battery_still_has_weight() {
        let dead = WeightInputs {
            battery_percentage: Some(0.0),
            ..inputs()
        };
        let w = WeightPolicy::unweighted().evaluate(&dead);
        assert_relative_eq!(w.battery_factor, 0.0);
        assert!(w.total > 0.0);
    }

    #[test]
    fn test_decay_per_hop() {
        let p = WeightPolicy::unweighted();
        assert_relative_eq!(p.decay(0), 1.0);
        assert_relative_eq!(p.decay(2), 0.64, epsilon = 1e-12);
        assert_relative_eq!(WeightPolicy::coefficiented().decay(1), 0.5);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(WeightPolicy::by_name("coefficiented"), Some(WeightPolicy::coefficiented()));
        assert_eq!(WeightPolicy::by_name("fuzzy"), None);
    }
}
