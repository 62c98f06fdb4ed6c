//! Final workflow result aggregation.

use serde::{Deserialize, Serialize};

use crate::ads::AdUpdateSummary;
use crate::extraction::LinkResult;

use super::context::ExecutionStatus;
use super::phase::WorkflowPhase;

/// Aggregate counters for one finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSummary {
    /// Link executions attempted (links × repeat count).
    pub total_links: usize,
    pub successful_links: usize,
    pub failed_links: usize,
    pub ads_updated: usize,
    pub ads_failed: usize,
    /// successful / total link executions; 0 when there were none.
    pub success_rate: f64,
    pub elapsed_ms: u64,
}

impl WorkflowSummary {
    pub fn compute(
        link_results: &[LinkResult],
        ad_update_summaries: &[AdUpdateSummary],
        elapsed_ms: u64,
    ) -> Self {
        let total_links = link_results.len();
        let successful_links = link_results.iter().filter(|r| r.success).count();
        let success_rate = if total_links == 0 {
            0.0
        } else {
            successful_links as f64 / total_links as f64
        };
        WorkflowSummary {
            total_links,
            successful_links,
            failed_links: total_links - successful_links,
            ads_updated: ad_update_summaries
                .iter()
                .map(|s| s.successful_updates)
                .sum(),
            ads_failed: ad_update_summaries.iter().map(|s| s.failed_updates).sum(),
            success_rate,
            elapsed_ms,
        }
    }
}

/// Everything one finished run produced: the per-phase audit trail, all link
/// results, ad-update outcomes, and the aggregate summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub phases: Vec<WorkflowPhase>,
    pub link_results: Vec<LinkResult>,
    pub ad_update_summaries: Vec<AdUpdateSummary>,
    pub summary: WorkflowSummary,
    pub errors: Vec<String>,
}
