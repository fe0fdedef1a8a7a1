//! Offloadable tasks as seen by the destination ranking.

use mistsim_env::NodeId;
use serde::{Deserialize, Serialize};

/// Sequential task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Why a task did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// Result arrived after `max_latency`.
    Latency,

    /// The executing device ran out of battery.
    DeviceDead,

    /// The source moved out of range before the result came back.
    DeviceMobility,

    /// The source was already dead when the task would have been generated.
    NotGeneratedDeviceDead,

    /// No node was eligible to execute the task.
    NoOffloadingDestinations,

    InsufficientResources,

    InsufficientPower,
}

impl FailureReason {
    pub fn name(&self) -> &'static str {
        match self {
            FailureReason::Latency => "latency",
            FailureReason::DeviceDead => "device_dead",
            FailureReason::DeviceMobility => "device_mobility",
            FailureReason::NotGeneratedDeviceDead => "not_generated_device_dead",
            FailureReason::NoOffloadingDestinations => "no_offloading_destinations",
            FailureReason::InsufficientResources => "insufficient_resources",
            FailureReason::InsufficientPower => "insufficient_power",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Success,
    Failed(FailureReason),
}

/// A unit of work generated on an edge device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    pub application_id: u32,

    /// Device that generated the task.
    pub source: NodeId,

    /// Simulated time the task was generated at.
    pub created: f64,

    /// Maximum tolerated latency in seconds.
    pub max_latency: f64,

    /// Length in million instructions.
    pub length_mi: f64,

    pub status: TaskStatus,

    /// Destination picked by the ranking, once placed.
    pub destination: Option<NodeId>,
}

impl Task {
    pub fn new(id: TaskId, application_id: u32, source: NodeId) -> Self {
        Self {
            id,
            application_id,
            source,
            created: 0.0,
            max_latency: 0.0,
            length_mi: 0.0,
            status: TaskStatus::Pending,
            destination: None,
        }
    }

    pub fn created_at(mut self, time: f64) -> Self {
        self.created = time;
        self
    }

    pub fn with_max_latency(mut self, seconds: f64) -> Self {
        self.max_latency = seconds;
        self
    }

    pub fn with_length(mut self, length_mi: f64) -> Self {
        self.length_mi = length_mi;
        self
    }

    /// Records a successful placement.
    pub fn place(&mut self, destination: NodeId) {
        self.destination = Some(destination);
        self.status = TaskStatus::Success;
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.status = TaskStatus::Failed(reason);
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.status {
            TaskStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut task = Task::new(TaskId(1), 3, NodeId(5)).with_max_latency(0.5);
        assert_eq!(task.status, TaskStatus::Pending);
        task.place(NodeId(2));
        assert_eq!(task.destination, Some(NodeId(2)));
        assert_eq!(task.failure_reason(), None);

        task.fail(FailureReason::NoOffloadingDestinations);
        assert_eq!(task.failure_reason(), Some(FailureReason::NoOffloadingDestinations));
        assert_eq!(FailureReason::NoOffloadingDestinations.to_string(), "no_offloading_destinations");
    }
}
