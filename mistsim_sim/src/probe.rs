//! Orchestration probe: periodic placement requests against the ranking.

use mistsim_core::{
    ArchitectureFilter, CoreError, Dispatch, Entity, EntityContext, Event, EventKind, FailureReason,
    Task, TaskId, World,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Generates one task on a random device every interval and asks the
/// destination ranking where it should run.
#[derive(Debug, Clone)]
pub struct OrchestrationProbe {
    interval: f64,
    filter: ArchitectureFilter,
    rng: ChaCha8Rng,
    next_task: u64,
}

impl OrchestrationProbe {
    pub fn new(interval: f64, filter: ArchitectureFilter, rng: ChaCha8Rng) -> Self {
        Self {
            interval,
            filter,
            rng,
            next_task: 0,
        }
    }

    fn request(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        let now = ctx.now();
        let devices = ctx.world().nodes.edge_devices();
        if !devices.is_empty() {
            let source = devices[self.rng.gen_range(0..devices.len())];
            let mut task = Task::new(TaskId(self.next_task), 0, source)
                .created_at(now)
                .with_length(self.rng.gen_range(1_000.0..20_000.0));
            self.next_task += 1;

            let world = ctx.world_mut();
            if world.nodes.get(source)?.is_dead() {
                task.fail(FailureReason::NotGeneratedDeviceDead);
            } else {
                match world.select_destination(&task, self.filter, now) {
                    Ok(destination) => task.place(destination),
                    Err(CoreError::NoEligibleDestination(id)) => {
                        debug!("t={:.1} {} from {}: no eligible destination", now, id, source);
                        task.fail(FailureReason::NoOffloadingDestinations);
                    }
                    Err(e) => return Err(e),
                }
            }
            trace!("t={:.1} {} -> {:?}", now, task.id, task.status);
            world.tasks.push(task);
        }

        if now + self.interval < ctx.world().duration {
            ctx.schedule_self(self.interval, EventKind::PlacementRequest)?;
        }
        Ok(())
    }
}

impl Entity<World> for OrchestrationProbe {
    fn kind(&self) -> &'static str {
        "orchestration_probe"
    }

    fn on_start(&mut self, ctx: &mut EntityContext<'_, World>) -> Result<(), CoreError> {
        if self.interval > 0.0 && self.interval <= ctx.world().duration {
            ctx.schedule_self(self.interval, EventKind::PlacementRequest)?;
        }
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut EntityContext<'_, World>, event: Event) -> Result<Dispatch, CoreError> {
        match event.kind {
            EventKind::PlacementRequest => {
                self.request(ctx)?;
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Unhandled(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mistsim_core::{ClusterParams, ClusterProtocol, ComputingNode, NodeTable, Simulation, TaskStatus};
    use mistsim_env::{Battery, Location, NodeId, NodeKind, PowerSource};
    use rand::SeedableRng;

    fn world(source_power: PowerSource) -> World {
        let mut nodes = NodeTable::new();
        nodes
            .push(ComputingNode::new(NodeId(0), NodeKind::Cloud, "cloud", Location::ORIGIN).with_compute(8, 40_000.0))
            .unwrap();
        nodes
            .push(
                ComputingNode::new(NodeId(1), NodeKind::EdgeDevice, "phone", Location::new(5.0, 5.0))
                    .with_compute(4, 20_000.0)
                    .with_power(source_power),
            )
            .unwrap();
        World::new(nodes, ClusterProtocol::new(ClusterParams::default()), 10.0)
    }

    fn run(world: World, filter: ArchitectureFilter) -> Vec<Task> {
        let mut sim = Simulation::new(world);
        sim.register(Box::new(OrchestrationProbe::new(2.0, filter, ChaCha8Rng::seed_from_u64(3))));
        sim.run().unwrap();
        sim.world().tasks.clone()
    }

    #[test]
    fn test_requests_every_interval() {
        let tasks = run(world(PowerSource::Mains), ArchitectureFilter::All);
        let times: Vec<f64> = tasks.iter().map(|t| t.created).collect();
        assert_eq!(times, vec![2.0, 4.0, 6.0, 8.0]);
        assert!(tasks.iter().all(|t| t.source == NodeId(1)));
        // cloud 0.2 + 1 + 1 beats the stationary source 0.1 + 1 + 1
        assert!(tasks.iter().all(|t| t.destination == Some(NodeId(0))));
    }

    #[test]
    fn test_no_destination_is_a_task_failure() {
        let tasks = run(world(PowerSource::Mains), ArchitectureFilter::EdgeOnly);
        assert_eq!(tasks.len(), 4);
        assert!(tasks
            .iter()
            .all(|t| t.status == TaskStatus::Failed(FailureReason::NoOffloadingDestinations)));
    }

    #[test]
    fn test_dead_source_generates_nothing() {
        let dead = PowerSource::Battery(Battery::new(10.0, 0.0, 1.0));
        let tasks = run(world(dead), ArchitectureFilter::All);
        assert!(tasks
            .iter()
            .all(|t| t.failure_reason() == Some(FailureReason::NotGeneratedDeviceDead)));
    }
}
