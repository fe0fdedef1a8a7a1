//! Per-device entity driving the clustering protocol.

use mistsim_env::NodeId;
use tracing::debug;

use crate::error::CoreError;
use crate::kernel::{Dispatch, Entity, EntityContext, Event, EventKind};
use crate::world::World;

/// Ticks the protocol for one device every update interval.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAgent {
    node: NodeId,
}

impl ClusterAgent {
    /// Time of the first update.
    pub const FIRST_TICK: f64 = 1.0;

    pub fn new(node: NodeId) -> Self {
        Self { node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    fn tick(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let now = ctx.now();
        let World {
            nodes,
            clusters,
            protocol,
            stats,
            duration,
            ..
        } = ctx.world_mut();

        let outcome = protocol.update(nodes, clusters, self.node, now)?;
        stats.record(&outcome);
        if outcome.parent_changed() {
            debug!(
                "t={:.1} {}: parent {} -> {}",
                now, self.node, outcome.previous_parent, outcome.parent
            );
        }

        let interval = protocol.params().update_interval;
        let horizon = *duration;
        if now + interval < horizon {
            ctx.schedule_self(interval, EventKind::ClusterTick)?;
        }
        Ok(())
    }
}

impl Entity<World> for ClusterAgent {
    fn kind(&self) -> &'static str {
        "cluster_agent"
    }

    fn on_start(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        if Self::FIRST_TICK <= ctx.world().duration {
            ctx.schedule_self(Self::FIRST_TICK, EventKind::ClusterTick)?;
        }
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut EntityContext<'_, World>, event: Event) -> Result<Dispatch, CoreError> {
        match event.kind {
            EventKind::ClusterTick => {
                self.tick(ctx)?;
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Unhandled(event)),
        }
    }
}
