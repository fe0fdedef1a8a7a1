//! Named clustering and placement scenarios.

use mistsim_env::EnvError;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Three stationary devices, one clear orchestrator
    ThreeNode,

    /// Random-walk devices over the standard topology
    RandomWalk,

    /// Convoy following scripted waypoints across the map
    Highway,

    /// Batteries run flat halfway through the run
    BatteryDrain,

    /// Devices too far apart to cluster
    Sparse,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ThreeNode,
            ScenarioId::RandomWalk,
            ScenarioId::Highway,
            ScenarioId::BatteryDrain,
            ScenarioId::Sparse,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ThreeNode => "three_node",
            ScenarioId::RandomWalk => "random_walk",
            ScenarioId::Highway => "highway",
            ScenarioId::BatteryDrain => "battery_drain",
            ScenarioId::Sparse => "sparse",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ThreeNode => "3 stationary devices: the heavy one orchestrates its neighbor, the far one stays alone",
            ScenarioId::RandomWalk => "Mixed device profiles on random walks; forest must hold at every snapshot",
            ScenarioId::Highway => "Convoy along scripted waypoints; clusters form while it travels",
            ScenarioId::BatteryDrain => "Every battery empties by mid-run; dead sources stop generating tasks",
            ScenarioId::Sparse => "Devices scattered over a huge map; most stay their own orchestrator",
        }
    }

    /// True if the scenario ignores the device count and builds its own topology.
    pub fn is_fixed_topology(&self) -> bool {
        matches!(self, ScenarioId::ThreeNode)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "three_node" | "threenode" => Ok(ScenarioId::ThreeNode),
            "random_walk" | "randomwalk" => Ok(ScenarioId::RandomWalk),
            "highway" => Ok(ScenarioId::Highway),
            "battery_drain" | "batterydrain" => Ok(ScenarioId::BatteryDrain),
            "sparse" => Ok(ScenarioId::Sparse),
            _ => Err(EnvError::UnknownScenario(s.to_string())),
        }
    }
}

impl serde::Serialize for ScenarioId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
