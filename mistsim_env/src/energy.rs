//! Energy seam: the battery signal the clustering and ranking logic read.
//!
//! Detailed energy bookkeeping (per-task consumption, network energy) is
//! outside the simulator core. The core only asks two questions: is this
//! node running on a battery, and how full is it.

use serde::{Deserialize, Serialize};

/// Battery signal exposed by a node's energy model.
pub trait EnergyModel {
    /// Returns true if the node runs on a battery.
    fn is_battery_powered(&self) -> bool;

    /// Remaining battery charge in `[0, 100]`. Mains-powered nodes report 100.
    fn battery_level_percentage(&self) -> f64;

    /// Returns true if the node has a battery and it is empty.
    fn is_dead(&self) -> bool {
        self.is_battery_powered() && self.battery_level_percentage() <= 0.0
    }
}

/// A battery that drains linearly with simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Full capacity in watt-hours
    pub capacity_wh: f64,

    /// Charge left in watt-hours
    pub remaining_wh: f64,

    /// Constant idle drain in watts
    pub idle_drain_w: f64,
}

impl Battery {
    /// Creates a battery at `initial_percentage` of `capacity_wh`.
    pub fn new(capacity_wh: f64, initial_percentage: f64, idle_drain_w: f64) -> Self {
        let pct = initial_percentage.clamp(0.0, 100.0);
        Self {
            capacity_wh,
            remaining_wh: capacity_wh * pct / 100.0,
            idle_drain_w,
        }
    }

    /// Drains the idle consumption for `dt_secs` seconds.
    pub fn drain(&mut self, dt_secs: f64) {
        let used_wh = self.idle_drain_w * dt_secs / 3600.0;
        self.remaining_wh = (self.remaining_wh - used_wh).max(0.0);
    }

    fn percentage(&self) -> f64 {
        if self.capacity_wh <= 0.0 {
            return 0.0;
        }
        (self.remaining_wh / self.capacity_wh * 100.0).clamp(0.0, 100.0)
    }
}

/// How a node is powered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PowerSource {
    /// Plugged in; never runs out.
    Mains,

    /// Runs on a battery.
    Battery(Battery),
}

impl PowerSource {
    /// Advances the power source by `dt_secs` of idle time.
    pub fn drain(&mut self, dt_secs: f64) {
        if let PowerSource::Battery(battery) = self {
            battery.drain(dt_secs);
        }
    }
}

impl EnergyModel for PowerSource {
    fn is_battery_powered(&self) -> bool {
        matches!(self, PowerSource::Battery(_))
    }

    fn battery_level_percentage(&self) -> f64 {
        match self {
            PowerSource::Mains => 100.0,
            PowerSource::Battery(battery) => battery.percentage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mains_is_never_dead() {
        let mut mains = PowerSource::Mains;
        mains.drain(1.0e9);
        assert!(!mains.is_battery_powered());
        assert!(!mains.is_dead());
        assert_eq!(mains.battery_level_percentage(), 100.0);
    }

    #[test]
    fn test_battery_drains_linearly() {
        // 10 Wh at 100%, 36 W drain -> 1% per 10 seconds.
        let mut power = PowerSource::Battery(Battery::new(10.0, 100.0, 36.0));
        power.drain(10.0);
        assert!((power.battery_level_percentage() - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_battery_clamps_at_zero() {
        let mut power = PowerSource::Battery(Battery::new(1.0, 40.0, 3600.0));
        assert!((power.battery_level_percentage() - 40.0).abs() < 1e-9);
        power.drain(10.0);
        assert_eq!(power.battery_level_percentage(), 0.0);
        assert!(power.is_dead());
    }
}
