//! Simulation execution loop.
//!
//! Pops events in `(time, sequence)` order, advances the clock and
//! dispatches to the target entity. Purely synchronous and single-threaded:
//! each handler runs to completion before the next dequeue.

use tracing::{debug, trace};

use super::engine::EventKernel;
use super::entity::{Dispatch, Entity, EntityContext, EntityId};
use super::event::{EntityKey, Event, EventKey};
use crate::error::CoreError;

/// Mix two 64-bit values into a running hash.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Summary of a finished (or stopped) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub events_processed: u64,
    pub final_time: f64,
    pub unhandled_events: u64,
    /// Hash over the dequeue order; equal runs produce equal fingerprints.
    pub fingerprint: u64,
    /// True if a stop condition ended the run before the queue drained.
    pub stopped_early: bool,
}

struct Registered<W> {
    id: EntityId,
    entity: Box<dyn Entity<W>>,
}

/// Top-level simulation driver, generic over the shared world state `W`.
pub struct Simulation<W> {
    kernel: EventKernel,
    world: W,
    entities: Vec<Registered<W>>,
    started: bool,
    ended: bool,
    stop_requested: bool,
    unhandled: u64,
    fingerprint: u64,
}

impl<W> Simulation<W> {
    pub fn new(world: W) -> Self {
        Self {
            kernel: EventKernel::new(),
            world,
            entities: Vec::new(),
            started: false,
            ended: false,
            stop_requested: false,
            unhandled: 0,
            fingerprint: 0xcbf2_9ce4_8422_2325,
        }
    }

    /// Registers an entity; it receives a per-kind sequential id.
    pub fn register(&mut self, entity: Box<dyn Entity<W>>) -> EntityKey {
        let id = self.kernel.next_entity_id(entity.kind());
        let key = EntityKey(self.entities.len() as u32);
        debug!("registered {} as {}", id, key);
        self.entities.push(Registered { id, entity });
        key
    }

    /// Per-kind id of a registered entity.
    pub fn entity_id(&self, key: EntityKey) -> Option<EntityId> {
        self.entities.get(key.index()).map(|r| r.id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn kernel(&self) -> &EventKernel {
        &self.kernel
    }

    /// Queues an event from outside any handler (setup, tests).
    pub fn schedule(&mut self, event: Event) -> Result<EventKey, CoreError> {
        self.kernel.insert(event)
    }

    /// Current simulated time.
    pub fn clock(&self) -> f64 {
        self.kernel.clock()
    }

    /// Running fingerprint of the dequeue order.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Calls `on_start` on every entity, in registration order. Idempotent.
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        for (index, slot) in self.entities.iter_mut().enumerate() {
            let mut ctx = EntityContext::new(
                &mut self.kernel,
                &mut self.world,
                EntityKey(index as u32),
                slot.id,
                &mut self.stop_requested,
            );
            slot.entity.on_start(&mut ctx)?;
        }
        Ok(())
    }

    /// Dispatches exactly one event. Returns `Ok(None)` once the queue is empty.
    pub fn step(&mut self) -> Result<Option<EventKey>, CoreError> {
        self.start()?;
        let event = match self.kernel.pop_next() {
            Ok(event) => event,
            Err(_empty) => return Ok(None),
        };
        let key = event.key();

        self.fingerprint = hash_combine(self.fingerprint, event.time.to_bits());
        self.fingerprint = hash_combine(self.fingerprint, event.sequence as u64);
        self.fingerprint = hash_combine(self.fingerprint, event.target.0 as u64);

        let slot = self
            .entities
            .get_mut(event.target.index())
            .ok_or(CoreError::UnknownEntity(event.target))?;
        trace!("dispatch {} {} to {}", key, event.kind, slot.id);

        let mut ctx = EntityContext::new(
            &mut self.kernel,
            &mut self.world,
            event.target,
            slot.id,
            &mut self.stop_requested,
        );
        if let Dispatch::Unhandled(event) = slot.entity.on_event(&mut ctx, event)? {
            self.unhandled += 1;
            slot.entity.on_unhandled(&mut ctx, event);
        }
        Ok(Some(key))
    }

    /// Runs until the queue is empty or an entity requests a stop.
    pub fn run(&mut self) -> Result<RunSummary, CoreError> {
        self.run_until(f64::INFINITY)
    }

    /// Runs until the queue is empty, an entity requests a stop, or the
    /// next event lies beyond `stop_time`.
    pub fn run_until(&mut self, stop_time: f64) -> Result<RunSummary, CoreError> {
        self.start()?;
        let mut stopped_early = false;
        loop {
            if self.stop_requested {
                stopped_early = true;
                break;
            }
            match self.kernel.peek_time() {
                None => break,
                Some(t) if t > stop_time => {
                    stopped_early = true;
                    break;
                }
                Some(_) => {
                    self.step()?;
                }
            }
        }
        self.finish()?;
        Ok(self.summary(stopped_early))
    }

    /// Calls `on_simulation_end` on every entity exactly once.
    fn finish(&mut self) -> Result<(), CoreError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        for (index, slot) in self.entities.iter_mut().enumerate() {
            let mut ctx = EntityContext::new(
                &mut self.kernel,
                &mut self.world,
                EntityKey(index as u32),
                slot.id,
                &mut self.stop_requested,
            );
            slot.entity.on_simulation_end(&mut ctx)?;
        }
        debug!(
            "simulation ended at t={:.3} after {} events",
            self.kernel.clock(),
            self.kernel.dequeued()
        );
        Ok(())
    }

    fn summary(&self, stopped_early: bool) -> RunSummary {
        RunSummary {
            events_processed: self.kernel.dequeued(),
            final_time: self.kernel.clock(),
            unhandled_events: self.unhandled,
            fingerprint: self.fingerprint,
            stopped_early,
        }
    }
}
