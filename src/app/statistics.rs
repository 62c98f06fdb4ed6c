//! End-of-run statistics printing.

use colored::Colorize;
use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorKind, ProcessingStats};
use crate::retry::StatsSnapshot;

/// Prints the per-kind error counters accumulated during a run.
///
/// Kinds with zero occurrences are skipped to keep the output short.
pub fn print_error_statistics(stats: &ProcessingStats) {
    let total = stats.total();
    if total == 0 {
        info!("No errors recorded during this run");
        return;
    }
    info!("Error statistics ({total} total):");
    for kind in ErrorKind::iter() {
        let count = stats.count(kind);
        if count > 0 {
            info!("  {}: {}", kind.as_str(), count);
        }
    }
}

/// Prints per-operation retry/timing statistics.
pub fn print_operation_statistics(snapshot: &StatsSnapshot) {
    if snapshot.operations.is_empty() {
        return;
    }
    info!("Operation statistics:");
    let mut names: Vec<_> = snapshot.operations.keys().collect();
    names.sort();
    for name in names {
        let op = &snapshot.operations[name];
        info!(
            "  {}: {} ok / {} failed, {} attempts, avg {}ms",
            name,
            op.successes,
            op.failures,
            op.attempts,
            op.avg_duration_ms()
        );
    }
    if !snapshot.open_circuits.is_empty() {
        info!("  open circuits: {}", snapshot.open_circuits.join(", "));
    }
}

/// Prints the one-line end-of-run summary.
pub fn print_simple_summary(
    total_links: usize,
    successful_links: usize,
    failed_links: usize,
    ads_updated: usize,
    elapsed_seconds: f64,
) {
    let status = if failed_links == 0 {
        "OK".green()
    } else if successful_links > 0 {
        "PARTIAL".yellow()
    } else {
        "FAILED".red()
    };
    println!(
        "[{}] {} link execution(s): {} succeeded, {} failed; {} ad(s) updated in {:.1}s",
        status, total_links, successful_links, failed_links, ads_updated, elapsed_seconds
    );
}
