//! Notification sink.
//!
//! Sending a run summary is best-effort: failures are logged by the caller
//! and never propagated as workflow failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error_handling::CoreResult;

/// Summary pushed to the notification sink when a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionNotification {
    pub execution_id: String,
    pub config_name: String,
    pub status: String,
    pub total_links: usize,
    pub successful_links: usize,
    pub failed_links: usize,
    pub ads_updated: usize,
    pub elapsed_seconds: f64,
}

/// Capability to deliver an execution summary somewhere.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_summary(&self, notification: &ExecutionNotification) -> CoreResult<()>;
}

/// Sink that writes the summary to the log. The default when no external
/// delivery channel is configured.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send_summary(&self, notification: &ExecutionNotification) -> CoreResult<()> {
        log::info!(
            "Execution {} ({}) finished with status {}: {}/{} links succeeded, {} ad(s) updated in {:.1}s",
            notification.execution_id,
            notification.config_name,
            notification.status,
            notification.successful_links,
            notification.total_links,
            notification.ads_updated,
            notification.elapsed_seconds
        );
        Ok(())
    }
}
