//! Execution context: the live state of one in-flight run.

use serde::{Deserialize, Serialize};

use crate::ads::AdUpdateSummary;
use crate::extraction::LinkResult;

use super::phase::PhaseName;

/// Terminal status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight run of a tracking configuration.
///
/// Owned exclusively by the orchestrator for the run's lifetime; registered
/// in the live-execution table at start and removed on completion or
/// cancellation, whatever the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub config_id: String,
    pub config_name: String,
    /// Epoch millis when the run started.
    pub started_at_ms: i64,
    pub current_phase: PhaseName,
    /// 0–100.
    pub progress: u8,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    /// Link results accumulated so far.
    pub link_results: Vec<LinkResult>,
    /// Ad-update outcomes accumulated so far.
    pub ad_update_summaries: Vec<AdUpdateSummary>,
}

impl ExecutionContext {
    pub fn new(execution_id: String, config_id: String, config_name: String, started_at_ms: i64) -> Self {
        ExecutionContext {
            execution_id,
            config_id,
            config_name,
            started_at_ms,
            current_phase: PhaseName::Initialization,
            progress: 0,
            status: ExecutionStatus::Running,
            error: None,
            link_results: Vec::new(),
            ad_update_summaries: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_running_at_zero() {
        let ctx = ExecutionContext::new(
            "exec_1".to_string(),
            "cfg1".to_string(),
            "job".to_string(),
            1_700_000_000_000,
        );
        assert_eq!(ctx.status, ExecutionStatus::Running);
        assert_eq!(ctx.progress, 0);
        assert_eq!(ctx.current_phase, PhaseName::Initialization);
        assert!(ctx.link_results.is_empty());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ExecutionStatus::Running.as_str(), "RUNNING");
        assert_eq!(ExecutionStatus::Cancelled.as_str(), "CANCELLED");
    }
}
