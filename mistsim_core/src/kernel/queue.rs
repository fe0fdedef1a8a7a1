//! Ordered store of future events.
//!
//! A `BTreeMap` keyed by `(time, sequence)`: first-key lookup and removal by
//! key are O(log n), predicate removal is O(n). Iteration order never
//! depends on hashing or wall-clock state.

use std::collections::BTreeMap;

use super::event::{Event, EventKey};

/// The future-event queue owned by the kernel.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, Event>,

    /// Largest number of events ever queued at once.
    max_len: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already-sequenced event.
    pub(crate) fn push(&mut self, event: Event) {
        self.events.insert(event.key(), event);
        self.max_len = self.max_len.max(self.events.len());
    }

    /// Removes and returns the minimal event.
    pub(crate) fn pop_first(&mut self) -> Option<Event> {
        self.events.pop_first().map(|(_, event)| event)
    }

    /// Returns the minimal event without removing it.
    pub fn first(&self) -> Option<&Event> {
        self.events.first_key_value().map(|(_, event)| event)
    }

    /// Removes the event with the given key.
    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<Event> {
        self.events.remove(key)
    }

    /// Removes every event matching `predicate`; returns how many were removed.
    pub(crate) fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Event) -> bool,
    {
        let before = self.events.len();
        self.events.retain(|_, event| !predicate(event));
        before - self.events.len()
    }

    /// Iterates pending events in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::event::{EntityKey, EventKind};

    fn sequenced(time: f64, sequence: i64) -> Event {
        let mut e = Event::new(EntityKey(0), time, EventKind::Custom(1));
        e.sequence = sequence;
        e
    }

    #[test]
    fn test_pop_returns_minimal_key() {
        let mut q = EventQueue::new();
        q.push(sequenced(5.0, 0));
        q.push(sequenced(1.0, 1));
        q.push(sequenced(1.0, -1));

        assert_eq!(q.pop_first().map(|e| e.key()), Some(sequenced(1.0, -1).key()));
        assert_eq!(q.pop_first().map(|e| e.key()), Some(sequenced(1.0, 1).key()));
        assert_eq!(q.pop_first().map(|e| e.time), Some(5.0));
        assert!(q.pop_first().is_none());
    }

    #[test]
    fn test_remove_and_remove_where() {
        let mut q = EventQueue::new();
        for i in 0..6 {
            q.push(sequenced(i as f64, i));
        }
        assert_eq!(q.max_len(), 6);

        assert!(q.remove(&sequenced(2.0, 2).key()).is_some());
        assert!(q.remove(&sequenced(2.0, 2).key()).is_none());

        let removed = q.remove_where(|e| e.time >= 4.0);
        assert_eq!(removed, 2);
        assert_eq!(q.len(), 3);
        assert_eq!(q.max_len(), 6);
    }
}
