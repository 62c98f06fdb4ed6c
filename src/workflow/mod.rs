//! Workflow orchestration: phase state machine, execution contexts, and the
//! observable event stream.

mod context;
mod events;
mod orchestrator;
mod phase;
mod result;

pub use context::{ExecutionContext, ExecutionStatus};
pub use events::{WorkflowEvent, WorkflowEvents};
pub use orchestrator::{StoredExecution, WorkflowOrchestrator, WorkflowSettings};
pub use phase::{PhaseName, PhaseStatus, WorkflowPhase};
pub use result::{WorkflowResult, WorkflowSummary};
