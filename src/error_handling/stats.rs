//! Processing statistics tracking.
//!
//! Thread-safe per-kind error counters, shared across tasks via `Arc` and
//! printed at the end of a run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ErrorKind;

/// Thread-safe error statistics tracker.
///
/// Every [`ErrorKind`] counter is initialized to zero on creation, so
/// incrementing never allocates and the map is never mutated after
/// construction.
pub struct ProcessingStats {
    errors: HashMap<ErrorKind, AtomicUsize>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for kind in ErrorKind::iter() {
            errors.insert(kind, AtomicUsize::new(0));
        }
        ProcessingStats { errors }
    }

    /// Increment the counter for an error kind.
    pub fn increment(&self, kind: ErrorKind) {
        if let Some(counter) = self.errors.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "No counter for {:?}; ProcessingStats was not fully initialized",
                kind
            );
        }
    }

    /// Get the count for an error kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total error count across all kinds.
    pub fn total(&self) -> usize {
        ErrorKind::iter().map(|k| self.count(k)).sum()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
