//! Workflow event stream.
//!
//! The orchestrator publishes phase transitions and context snapshots onto a
//! broadcast channel; consumers subscribe instead of registering callbacks.
//! Publishing never blocks and never fails the workflow: with no subscribers
//! the event is simply dropped.

use tokio::sync::broadcast;

use super::context::{ExecutionContext, ExecutionStatus};
use super::phase::PhaseName;

/// One observable workflow transition.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    PhaseStarted {
        execution_id: String,
        phase: PhaseName,
    },
    PhaseCompleted {
        execution_id: String,
        phase: PhaseName,
    },
    PhaseFailed {
        execution_id: String,
        phase: PhaseName,
        error: String,
    },
    /// Snapshot of the execution context after a state change.
    Progress { snapshot: Box<ExecutionContext> },
    Finished {
        execution_id: String,
        status: ExecutionStatus,
    },
}

/// Broadcast publisher for workflow events.
pub struct WorkflowEvents {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        WorkflowEvents { sender }
    }

    /// A new subscription receiving events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: WorkflowEvent) {
        // An Err here only means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

impl Default for WorkflowEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
