//! Per-operation retry statistics.
//!
//! Tracks success/failure counts and timing per operation name, queryable as
//! a snapshot plus an aggregate health status.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Aggregate health derived from recent operation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Failure rate below 10%.
    Healthy,
    /// Failure rate between 10% and 50%, or at least one circuit open.
    Degraded,
    /// Failure rate at or above 50%.
    Unhealthy,
}

/// Statistics for one named operation.
#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    /// Successful completions (after any retries).
    pub successes: u64,
    /// Exhausted failures (including circuit-open fast failures).
    pub failures: u64,
    /// Total attempts across all calls, retries included.
    pub attempts: u64,
    /// Cumulative wall-clock time spent in this operation, milliseconds.
    pub total_duration_ms: u64,
}

impl OperationStats {
    /// Mean call duration in milliseconds (0 when no calls completed).
    pub fn avg_duration_ms(&self) -> u64 {
        let calls = self.successes + self.failures;
        if calls == 0 {
            0
        } else {
            self.total_duration_ms / calls
        }
    }
}

/// Snapshot of all operation statistics at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Per-operation entries keyed by operation name.
    pub operations: HashMap<String, OperationStats>,
    /// Names of operations whose circuit is currently open.
    pub open_circuits: Vec<String>,
}

impl StatsSnapshot {
    /// Total successes across all operations.
    pub fn total_successes(&self) -> u64 {
        self.operations.values().map(|s| s.successes).sum()
    }

    /// Total failures across all operations.
    pub fn total_failures(&self) -> u64 {
        self.operations.values().map(|s| s.failures).sum()
    }

    /// Aggregate health classification.
    pub fn health(&self) -> HealthStatus {
        let successes = self.total_successes();
        let failures = self.total_failures();
        let total = successes + failures;
        if total == 0 {
            return if self.open_circuits.is_empty() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            };
        }
        let failure_rate = failures as f64 / total as f64;
        if failure_rate >= 0.5 {
            HealthStatus::Unhealthy
        } else if failure_rate >= 0.1 || !self.open_circuits.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Mutable statistics table shared by the retry manager.
#[derive(Default)]
pub struct StatsTable {
    entries: RwLock<HashMap<String, OperationStats>>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed call.
    pub async fn record(&self, operation: &str, success: bool, attempts: u32, duration_ms: u64) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(operation.to_string()).or_default();
        if success {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
        entry.attempts += u64::from(attempts);
        entry.total_duration_ms += duration_ms;
    }

    /// Copies the current per-operation statistics.
    pub async fn snapshot(&self) -> HashMap<String, OperationStats> {
        self.entries.read().await.clone()
    }
}
