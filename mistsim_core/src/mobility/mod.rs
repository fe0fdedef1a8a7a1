//! Mobility and location prediction.
//!
//! Every node owns a [`MobilityModel`]. At setup the model precomputes a
//! [`Trajectory`] sampled every update interval (integer milliseconds), so
//! the clustering protocol can ask "where is node N at time T" for the
//! current tick and the next one in O(1).

mod model;
mod params;
mod trajectory;
mod walk;

pub use model::MobilityModel;
pub use params::{MapBounds, MobilityParams};
pub use trajectory::{to_millis, PathPlan, Trajectory};
pub use walk::{RandomWalk, Waypoints};
