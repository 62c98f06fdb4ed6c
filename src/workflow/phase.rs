//! Workflow phases and their audit trail.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The pipeline stages, in execution order. Each phase's precondition is the
/// prior phase's successful completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseName {
    Initialization,
    LinkProcessing,
    UrlExtraction,
    AdMapping,
    GoogleAdsUpdate,
    Verification,
    Notification,
    Completion,
}

impl PhaseName {
    /// Every phase in pipeline order.
    pub const ALL: [PhaseName; 8] = [
        PhaseName::Initialization,
        PhaseName::LinkProcessing,
        PhaseName::UrlExtraction,
        PhaseName::AdMapping,
        PhaseName::GoogleAdsUpdate,
        PhaseName::Verification,
        PhaseName::Notification,
        PhaseName::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::Initialization => "initialization",
            PhaseName::LinkProcessing => "link_processing",
            PhaseName::UrlExtraction => "url_extraction",
            PhaseName::AdMapping => "ad_mapping",
            PhaseName::GoogleAdsUpdate => "google_ads_update",
            PhaseName::Verification => "verification",
            PhaseName::Notification => "notification",
            PhaseName::Completion => "completion",
        }
    }
}

impl std::fmt::Display for PhaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One named stage of the pipeline with wall-clock timestamps. An ordered
/// list of these forms the audit trail of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPhase {
    pub name: PhaseName,
    pub status: PhaseStatus,
    pub started_at_ms: Option<i64>,
    pub ended_at_ms: Option<i64>,
    pub error: Option<String>,
}

impl WorkflowPhase {
    pub fn new(name: PhaseName) -> Self {
        WorkflowPhase {
            name,
            status: PhaseStatus::Pending,
            started_at_ms: None,
            ended_at_ms: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = PhaseStatus::Running;
        self.started_at_ms = Some(Utc::now().timestamp_millis());
    }

    pub fn complete(&mut self) {
        self.status = PhaseStatus::Completed;
        self.ended_at_ms = Some(Utc::now().timestamp_millis());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PhaseStatus::Failed;
        self.ended_at_ms = Some(Utc::now().timestamp_millis());
        self.error = Some(error.into());
    }
}
