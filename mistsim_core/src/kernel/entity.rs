//! Simulated actors and the context handed to them on every callback.

use tracing::warn;

use super::engine::EventKernel;
use super::event::{EntityKey, Event, EventKey, EventKind, Payload};
use crate::error::CoreError;

/// Kernel-scoped id of an entity, sequential among entities of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub kind: &'static str,
    pub index: u32,
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

/// Result of offering an event to an entity.
#[derive(Debug)]
pub enum Dispatch {
    /// The entity consumed the event.
    Handled,

    /// The entity does not know this kind; the driver forwards it to
    /// [`Entity::on_unhandled`].
    Unhandled(Event),
}

/// Any simulated actor.
///
/// # Contract
///
/// Implementations must:
/// - route all scheduling through the [`EntityContext`]
/// - keep no global mutable state
/// - be deterministic for equal inputs
pub trait Entity<W> {
    /// Concrete kind name; entity ids are sequential per kind.
    fn kind(&self) -> &'static str;

    /// Called once before the first dispatch.
    fn on_start(&mut self, _ctx: &mut EntityContext<'_, W>) -> Result<(), CoreError> {
        Ok(())
    }

    /// Handles one event addressed to this entity.
    fn on_event(&mut self, ctx: &mut EntityContext<'_, W>, event: Event)
        -> Result<Dispatch, CoreError>;

    /// Fallback for event kinds `on_event` did not recognize.
    fn on_unhandled(&mut self, ctx: &mut EntityContext<'_, W>, event: Event) {
        warn!(
            "{} ignored {} at t={:.3} (tag {})",
            ctx.id(),
            event.kind,
            event.time,
            event.kind.tag()
        );
    }

    /// Called once after the queue empties or a stop condition is reached.
    fn on_simulation_end(&mut self, _ctx: &mut EntityContext<'_, W>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Mutable context passed to an entity on every callback.
///
/// Borrows the kernel mutably, so an entity cannot touch queue order
/// outside of the scheduling API.
pub struct EntityContext<'a, W> {
    kernel: &'a mut EventKernel,
    world: &'a mut W,
    me: EntityKey,
    id: EntityId,
    stop_requested: &'a mut bool,
}

impl<'a, W> EntityContext<'a, W> {
    pub(crate) fn new(
        kernel: &'a mut EventKernel,
        world: &'a mut W,
        me: EntityKey,
        id: EntityId,
        stop_requested: &'a mut bool,
    ) -> Self {
        Self {
            kernel,
            world,
            me,
            id,
            stop_requested,
        }
    }

    /// Current simulated time.
    #[inline]
    pub fn now(&self) -> f64 {
        self.kernel.clock()
    }

    /// Key of the entity being called.
    #[inline]
    pub fn me(&self) -> EntityKey {
        self.me
    }

    /// Per-kind id of the entity being called.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn world(&self) -> &W {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut *self.world
    }

    /// Schedules `kind` for `target` at `now + delay`.
    pub fn schedule(
        &mut self,
        target: EntityKey,
        delay: f64,
        kind: EventKind,
        payload: Option<Payload>,
    ) -> Result<EventKey, CoreError> {
        let mut event = Event::new(target, self.now() + delay, kind);
        event.payload = payload;
        self.kernel.insert(event)
    }

    /// Schedules `kind` for the calling entity at `now + delay`.
    pub fn schedule_self(&mut self, delay: f64, kind: EventKind) -> Result<EventKey, CoreError> {
        self.schedule(self.me, delay, kind, None)
    }

    /// Schedules `kind` for `target` at `now`, ahead of anything already
    /// queued for this instant.
    pub fn schedule_now(
        &mut self,
        target: EntityKey,
        kind: EventKind,
        payload: Option<Payload>,
    ) -> Result<EventKey, CoreError> {
        let mut event = Event::new(target, self.now(), kind);
        event.payload = payload;
        self.kernel.insert_first(event)
    }

    /// Cancels a pending event. Returns false if it already fired.
    pub fn cancel(&mut self, key: &EventKey) -> bool {
        self.kernel.remove(key).is_some()
    }

    /// Cancels every pending event of the calling entity with the given kind.
    pub fn cancel_own(&mut self, kind: EventKind) -> usize {
        let me = self.me;
        self.kernel
            .remove_where(|e| e.target == me && e.kind == kind)
    }

    /// Asks the driver to stop after this callback returns.
    pub fn request_stop(&mut self) {
        *self.stop_requested = true;
    }
}
