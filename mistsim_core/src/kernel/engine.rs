//! The event kernel: future-event queue plus simulation clock.

use std::collections::BTreeMap;

use tracing::trace;

use super::entity::EntityId;
use super::event::{Event, EventKey};
use super::queue::EventQueue;
use crate::error::CoreError;

/// Returned by [`EventKernel::pop_next`] when nothing is left to dispatch.
///
/// This is the normal end of a simulation, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyQueue;

impl std::fmt::Display for EmptyQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event queue is empty")
    }
}

/// Ordered event queue and simulation clock.
///
/// Sequence numbers come from two kernel-owned counters: `insert` counts up
/// from zero, `insert_first` counts down from -1. A front-inserted event
/// therefore sorts before every event already queued at the same time.
#[derive(Debug, Clone)]
pub struct EventKernel {
    queue: EventQueue,

    /// Current simulated time (seconds). Only moves on dequeue.
    clock: f64,

    next_sequence: i64,
    lowest_sequence: i64,

    /// Events dequeued so far.
    dequeued: u64,

    /// Per-kind counters for entity ids.
    entity_counters: BTreeMap<&'static str, u32>,
}

impl EventKernel {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            clock: 0.0,
            next_sequence: 0,
            lowest_sequence: 0,
            dequeued: 0,
            entity_counters: BTreeMap::new(),
        }
    }

    /// Current simulated time.
    #[inline]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Queues `event` behind everything already scheduled for its time.
    pub fn insert(&mut self, mut event: Event) -> Result<EventKey, CoreError> {
        self.check_causal(event.time)?;
        event.sequence = self.next_sequence;
        self.next_sequence += 1;
        let key = event.key();
        self.queue.push(event);
        Ok(key)
    }

    /// Queues `event` ahead of everything already scheduled for its time.
    pub fn insert_first(&mut self, mut event: Event) -> Result<EventKey, CoreError> {
        self.check_causal(event.time)?;
        self.lowest_sequence -= 1;
        event.sequence = self.lowest_sequence;
        let key = event.key();
        self.queue.push(event);
        Ok(key)
    }

    /// Removes the minimal `(time, sequence)` event and advances the clock to it.
    pub fn pop_next(&mut self) -> Result<Event, EmptyQueue> {
        let event = self.queue.pop_first().ok_or(EmptyQueue)?;
        debug_assert!(event.time >= self.clock, "clock went backwards");
        self.clock = event.time;
        self.dequeued += 1;
        trace!(
            "dequeue {} {} -> {}",
            event.key(),
            event.kind,
            event.target
        );
        Ok(event)
    }

    /// Time of the next event, if any.
    pub fn peek_time(&self) -> Option<f64> {
        self.queue.first().map(|e| e.time)
    }

    /// Cancels a pending event.
    pub fn remove(&mut self, key: &EventKey) -> Option<Event> {
        self.queue.remove(key)
    }

    /// Cancels every pending event matching `predicate`.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&Event) -> bool,
    {
        self.queue.remove_where(predicate)
    }

    /// Mints the next id for an entity of `kind`.
    ///
    /// Ids are sequential per kind, not globally unique.
    pub fn next_entity_id(&mut self, kind: &'static str) -> EntityId {
        let counter = self.entity_counters.entry(kind).or_insert(0);
        let id = EntityId {
            kind,
            index: *counter,
        };
        *counter += 1;
        id
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Largest number of events ever queued at once.
    pub fn max_pending(&self) -> usize {
        self.queue.max_len()
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    /// Read-only view of the pending events in dequeue order.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    fn check_causal(&self, time: f64) -> Result<(), CoreError> {
        if time.is_nan() || time < self.clock {
            return Err(CoreError::NonCausal {
                requested: time,
                now: self.clock,
            });
        }
        Ok(())
    }
}

impl Default for EventKernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::event::{EntityKey, EventKind};

    fn ev(time: f64, tag: u32) -> Event {
        Event::new(EntityKey(0), time, EventKind::Custom(tag))
    }

    fn drain(kernel: &mut EventKernel) -> Vec<u32> {
        let mut tags = Vec::new();
        while let Ok(e) = kernel.pop_next() {
            tags.push(e.kind.tag());
        }
        tags
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut kernel = EventKernel::new();
        kernel.insert(ev(10.0, 1)).unwrap();
        kernel.insert(ev(10.0, 2)).unwrap();
        kernel.insert(ev(10.0, 3)).unwrap();

        assert_eq!(drain(&mut kernel), vec![1, 2, 3]);
    }

    #[test]
    fn test_time_ordering() {
        let mut kernel = EventKernel::new();
        kernel.insert(ev(30.0, 3)).unwrap();
        kernel.insert(ev(10.0, 1)).unwrap();
        kernel.insert(ev(20.0, 2)).unwrap();

        let first = kernel.pop_next().unwrap();
        assert_eq!(first.time, 10.0);
        assert_eq!(kernel.clock(), 10.0);
        assert_eq!(drain(&mut kernel), vec![2, 3]);
        assert_eq!(kernel.clock(), 30.0);
    }

    #[test]
    fn test_insert_first_jumps_same_time_events() {
        let mut kernel = EventKernel::new();
        kernel.insert(ev(0.0, 1)).unwrap();
        kernel.insert(ev(0.0, 2)).unwrap();
        kernel.insert_first(ev(0.0, 9)).unwrap();
        kernel.insert_first(ev(0.0, 8)).unwrap();

        // Later front-inserts get lower sequences and run first.
        assert_eq!(drain(&mut kernel), vec![8, 9, 1, 2]);
    }

    #[test]
    fn test_insert_first_does_not_jump_earlier_times() {
        let mut kernel = EventKernel::new();
        kernel.insert(ev(1.0, 1)).unwrap();
        kernel.insert_first(ev(2.0, 2)).unwrap();
        assert_eq!(drain(&mut kernel), vec![1, 2]);
    }

    #[test]
    fn test_empty_queue_is_normal_termination() {
        let mut kernel = EventKernel::new();
        assert_eq!(kernel.pop_next(), Err(EmptyQueue));
        assert_eq!(kernel.clock(), 0.0);
    }

    #[test]
    fn test_non_causal_insert_rejected() {
        let mut kernel = EventKernel::new();
        kernel.insert(ev(5.0, 1)).unwrap();
        kernel.pop_next().unwrap();

        let err = kernel.insert(ev(4.0, 2)).unwrap_err();
        assert_eq!(err, CoreError::NonCausal { requested: 4.0, now: 5.0 });
        assert!(kernel.insert(ev(f64::NAN, 3)).is_err());
    }

    #[test]
    fn test_remove_cancels_pending_event() {
        let mut kernel = EventKernel::new();
        let keep = kernel.insert(ev(1.0, 1)).unwrap();
        let cancel = kernel.insert(ev(2.0, 2)).unwrap();
        kernel.insert(ev(3.0, 3)).unwrap();

        assert!(kernel.remove(&cancel).is_some());
        assert!(kernel.remove(&cancel).is_none());
        assert_eq!(kernel.remove_where(|e| e.kind == EventKind::Custom(3)), 1);
        assert_eq!(kernel.pending(), 1);
        assert_eq!(kernel.pop_next().unwrap().key(), keep);
        assert_eq!(kernel.max_pending(), 3);
    }

    #[test]
    fn test_entity_ids_are_scoped_per_kind() {
        let mut kernel = EventKernel::new();
        assert_eq!(kernel.next_entity_id("device").index, 0);
        assert_eq!(kernel.next_entity_id("device").index, 1);
        assert_eq!(kernel.next_entity_id("manager").index, 0);
        assert_eq!(kernel.next_entity_id("device").index, 2);
    }

    proptest::proptest! {
        #[test]
        fn prop_dequeue_order_is_sorted(
            ops in proptest::collection::vec((0u8..20, proptest::bool::ANY), 1..64)
        ) {
            let mut kernel = EventKernel::new();
            for (i, (t, front)) in ops.iter().enumerate() {
                let e = ev(*t as f64, i as u32);
                if *front {
                    kernel.insert_first(e).unwrap();
                } else {
                    kernel.insert(e).unwrap();
                }
            }
            let mut last: Option<EventKey> = None;
            while let Ok(e) = kernel.pop_next() {
                if let Some(prev) = last {
                    proptest::prop_assert!(prev < e.key());
                }
                last = Some(e.key());
            }
            proptest::prop_assert_eq!(kernel.dequeued(), ops.len() as u64);
        }
    }
}
