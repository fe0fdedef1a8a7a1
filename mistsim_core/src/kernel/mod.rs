//! Discrete-event kernel.
//!
//! - `event`: event records and the `(time, sequence)` ordering key
//! - `queue`: the ordered future-event store
//! - `engine`: clock, sequence counters and per-kind entity ids
//! - `entity`: the actor trait and its callback context
//! - `simulation`: the dispatch loop that ties them together

mod engine;
mod entity;
mod event;
mod queue;
mod simulation;

pub use engine::{EmptyQueue, EventKernel};
pub use entity::{Dispatch, Entity, EntityContext, EntityId};
pub use event::{EntityKey, Event, EventKey, EventKind, Payload};
pub use queue::EventQueue;
pub use simulation::{hash_combine, RunSummary, Simulation};
