//! Simulation manager: periodic bookkeeping and progress reports.

use mistsim_core::{CoreError, Dispatch, Entity, EntityContext, Event, EventKind, World};
use tracing::{debug, info};

/// Number of progress reports over a run.
const PROGRESS_STEPS: u32 = 10;

/// Drains batteries, records cluster snapshots and reports progress.
#[derive(Debug, Clone)]
pub struct SimulationManager {
    status_interval: f64,
    last_status: f64,
    progress_step: f64,
}

impl SimulationManager {
    pub fn new(status_interval: f64) -> Self {
        Self {
            status_interval,
            last_status: 0.0,
            progress_step: 0.0,
        }
    }

    fn update_status(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let now = ctx.now();
        let elapsed = now - self.last_status;
        self.last_status = now;

        let world = ctx.world_mut();
        for node in world.nodes.iter_mut() {
            node.power.drain(elapsed);
        }
        // Battery levels feed the weights.
        world.protocol.invalidate();
        let snapshot = world.capture_snapshot(now)?;
        debug!(
            "t={:.1}: {} orchestrators, largest cluster {}",
            now,
            snapshot.cluster_count(),
            snapshot.largest_cluster()
        );

        let duration = world.duration;
        if now + self.status_interval <= duration {
            ctx.schedule_self(self.status_interval, EventKind::UpdateStatus)?;
        }
        Ok(())
    }

    fn show_progress(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let now = ctx.now();
        let world = ctx.world();
        let pct = (now / world.duration * 100.0).round();
        debug!(
            "progress {}% (t={:.1}, {} placements, {} parent changes)",
            pct,
            now,
            world.tasks.len(),
            world.stats.parent_changes
        );
        if now + self.progress_step <= world.duration {
            ctx.schedule_self(self.progress_step, EventKind::ShowProgress)?;
        }
        Ok(())
    }
}

impl Entity<World> for SimulationManager {
    fn kind(&self) -> &'static str {
        "simulation_manager"
    }

    fn on_start(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let duration = ctx.world().duration;
        if self.status_interval <= duration {
            ctx.schedule_self(self.status_interval, EventKind::UpdateStatus)?;
        }
        self.progress_step = duration / PROGRESS_STEPS as f64;
        if self.progress_step > 0.0 {
            ctx.schedule_self(self.progress_step, EventKind::ShowProgress)?;
        }
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut EntityContext<'_, World>, event: Event) -> Result<Dispatch, CoreError> {
        match event.kind {
            EventKind::UpdateStatus => self.update_status(ctx)?,
            EventKind::ShowProgress => self.show_progress(ctx)?,
            _ => return Ok(Dispatch::Unhandled(event)),
        }
        Ok(Dispatch::Handled)
    }

    fn on_simulation_end(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let now = ctx.now();
        let world = ctx.world_mut();
        if world.snapshots.last().map_or(true, |s| s.time < now) {
            world.capture_snapshot(now)?;
        }
        info!(
            "simulation finished at t={:.1}: {} snapshots, {} tasks, {} cluster updates",
            now,
            world.snapshots.len(),
            world.tasks.len(),
            world.stats.updates
        );
        Ok(())
    }
}
