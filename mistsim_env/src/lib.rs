//! mistsim Environment Boundary
//!
//! Everything the simulation core consumes from the outside world lives
//! here, behind plain types and small traits:
//! - **Identity**: `NodeId` and the `NodeKind` tiers (cloud / edge / mist)
//! - **Space**: the immutable `Location` value type
//! - **Energy**: the `EnergyModel` seam and a concrete `PowerSource`
//! - **Randomness**: a `SeedTree` that derives independent ChaCha streams
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use mistsim_env::{Location, SeedTree, streams};
//!
//! let seeds = SeedTree::new(42);
//! let mut rng = seeds.stream(streams::MOBILITY, 7);
//! let a = Location::new(0.0, 0.0);
//! assert_eq!(a.distance_to(&Location::new(3.0, 4.0)), 5.0);
//! ```

mod energy;
mod error;
mod seeds;
mod types;

pub use energy::{Battery, EnergyModel, PowerSource};
pub use error::EnvError;
pub use seeds::{streams, SeedTree};
pub use types::{Location, NodeId, NodeKind};
