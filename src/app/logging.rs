//! Progress and structured logging utilities.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;

/// Logs progress of an in-flight execution.
///
/// # Arguments
///
/// * `start_time` - When the execution started
/// * `completed` - Atomic counter of completed link executions
/// * `failed` - Atomic counter of failed link executions
/// * `total` - Total link executions expected, when known
pub fn log_progress(
    start_time: std::time::Instant,
    completed: &Arc<AtomicUsize>,
    failed: &Arc<AtomicUsize>,
    total: Option<usize>,
) {
    let elapsed = start_time.elapsed().as_secs_f64();
    let done = completed.load(Ordering::SeqCst);
    let failures = failed.load(Ordering::SeqCst);
    let rate = if elapsed > 0.0 {
        (done + failures) as f64 / elapsed
    } else {
        0.0
    };
    match total {
        Some(total) => info!(
            "Progress: {}/{} executions done ({} failed) in {:.1}s (~{:.2}/sec)",
            done + failures,
            total,
            failures,
            elapsed,
            rate
        ),
        None => info!(
            "Progress: {} executions done ({} failed) in {:.1}s (~{:.2}/sec)",
            done + failures,
            failures,
            elapsed,
            rate
        ),
    }
}

/// Emits a structured audit entry.
///
/// Before/after state snapshots are logged as compact strings so the audit
/// trail can be grepped out of plain or JSON logs.
pub fn audit_log(
    action: &str,
    resource: &str,
    before: Option<&str>,
    after: Option<&str>,
    success: bool,
) {
    info!(
        "audit action={action} resource={resource} before={} after={} success={success}",
        before.unwrap_or("-"),
        after.unwrap_or("-"),
    );
}

/// Emits a structured performance entry.
pub fn perf_log(operation: &str, duration_ms: u64) {
    log::debug!("perf operation={operation} duration_ms={duration_ms}");
}
