//! Event records for the discrete-event kernel.
//!
//! Events are ordered by `(time, sequence)`. The sequence is assigned by
//! the kernel at insertion time and is the only tie-breaker between events
//! sharing the same simulated time, which makes dequeue order a strict
//! total order.

use mistsim_env::NodeId;
use std::cmp::Ordering;

// ── Entity key ────────────────────────────────────────────────────────

/// Registration slot of an entity inside a simulation; the target of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(pub u32);

impl EntityKey {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.0)
    }
}

// ── Event kind ────────────────────────────────────────────────────────

/// What an event asks its target to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Emit a log line (payload carries the text).
    PrintLog,

    /// Report simulation progress.
    ShowProgress,

    /// Periodic bookkeeping: battery drain, cluster snapshots.
    UpdateStatus,

    /// Ask the orchestration layer to place a task.
    PlacementRequest,

    /// One clustering-protocol update for a node.
    ClusterTick,

    /// Extension point for harness-specific kinds.
    Custom(u32),
}

impl EventKind {
    /// Stable numeric tag for logs and traces.
    pub fn tag(&self) -> u32 {
        match self {
            EventKind::PrintLog => 1,
            EventKind::ShowProgress => 2,
            EventKind::UpdateStatus => 10,
            EventKind::PlacementRequest => 15,
            EventKind::ClusterTick => 11000,
            EventKind::Custom(tag) => *tag,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::PrintLog => write!(f, "PrintLog"),
            EventKind::ShowProgress => write!(f, "ShowProgress"),
            EventKind::UpdateStatus => write!(f, "UpdateStatus"),
            EventKind::PlacementRequest => write!(f, "PlacementRequest"),
            EventKind::ClusterTick => write!(f, "ClusterTick"),
            EventKind::Custom(tag) => write!(f, "Custom({})", tag),
        }
    }
}

/// Optional data carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Node(NodeId),
    Value(f64),
    Text(String),
}

// ── Event key ─────────────────────────────────────────────────────────

/// The `(time, sequence)` pair that orders the queue and identifies an event.
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    pub time: f64,
    pub sequence: i64,
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.3}#{}", self.time, self.sequence)
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Entity the event is delivered to.
    pub target: EntityKey,

    /// Absolute simulated time of delivery.
    pub time: f64,

    pub kind: EventKind,

    pub payload: Option<Payload>,

    /// Assigned by the kernel on insertion; meaningless before that.
    pub sequence: i64,
}

impl Event {
    /// Creates an unsequenced event for `target` at absolute `time`.
    pub fn new(target: EntityKey, time: f64, kind: EventKind) -> Self {
        Self {
            target,
            time,
            kind,
            payload: None,
            sequence: 0,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns the ordering key.
    pub fn key(&self) -> EventKey {
        EventKey {
            time: self.time,
            sequence: self.sequence,
        }
    }
}
