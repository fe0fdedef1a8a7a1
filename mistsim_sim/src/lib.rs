//! mistsim scenario harness
//!
//! Assembles a [`World`](mistsim_core::World) from a [`SimConfig`], registers
//! the entities that drive it and checks named scenarios.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SimWorld                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Simulation<World> (EventKernel: (time, sequence) queue) │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │      │                  │                      │             │
//! │ ┌────▼──────────┐ ┌─────▼────────┐ ┌───────────▼─────────┐   │
//! │ │ Simulation    │ │ ClusterAgent │ │ OrchestrationProbe  │   │
//! │ │ Manager       │ │  (per device)│ │ (placement requests)│   │
//! │ └───────────────┘ └──────────────┘ └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mistsim_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 20)
//!     .with_duration(120.0)
//!     .run(ScenarioId::RandomWalk);
//! assert!(result.passed);
//! ```

mod error;
mod exporter;
mod manager;
mod probe;
mod runner;
pub mod scenarios;
pub mod topology;
mod world;

pub use error::SimError;
pub use exporter::{NodeFrame, SimExport, SimFrame};
pub use manager::SimulationManager;
pub use probe::OrchestrationProbe;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld};
