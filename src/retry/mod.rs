//! Retry, backoff, and circuit-breaker execution.
//!
//! Every outbound call in the orchestration core goes through
//! [`RetryManager`]; no component implements its own retry loop. Failing
//! operations are retried with exponential backoff when their error class is
//! transient, guarded by a per-operation circuit breaker, and recorded in a
//! per-operation statistics table.

mod circuit;
mod stats;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;

use crate::config::{
    CIRCUIT_COOLDOWN, CIRCUIT_FAILURE_THRESHOLD, RETRY_FACTOR, RETRY_INITIAL_DELAY_MS,
    RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_SECS,
};
use crate::error_handling::{CoreError, CoreResult, ErrorKind};

pub use circuit::{CircuitBreaker, CircuitState};
pub use stats::{HealthStatus, OperationStats, StatsSnapshot, StatsTable};

/// Backoff and attempt-cap settings for retried operations.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Total attempts per call, including the initial attempt.
    pub max_attempts: usize,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay on each retry.
    pub factor: u64,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    /// Consecutive failures before an operation's circuit opens.
    pub circuit_threshold: u32,
    /// Cooldown before an open circuit admits a half-open probe.
    pub circuit_cooldown: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            factor: RETRY_FACTOR,
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            circuit_threshold: CIRCUIT_FAILURE_THRESHOLD,
            circuit_cooldown: CIRCUIT_COOLDOWN,
        }
    }
}

/// Options for [`RetryManager::execute_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum operations running concurrently.
    pub concurrency: usize,
    /// Optional per-operation timeout.
    pub timeout: Option<Duration>,
    /// Abort the remainder of the batch on the first failure. When `false`,
    /// every operation's outcome is collected independently.
    pub fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            timeout: None,
            fail_fast: false,
        }
    }
}

/// Centralized retry/backoff/circuit-breaker executor.
///
/// Holds one circuit breaker and one statistics entry per operation name.
/// State is process-wide and shared behind an `Arc`; mutation happens through
/// async locks, so interleaved tasks observe consistent read-modify-write
/// steps.
pub struct RetryManager {
    settings: RetrySettings,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    stats: StatsTable,
}

impl RetryManager {
    pub fn new(settings: RetrySettings) -> Self {
        RetryManager {
            settings,
            breakers: RwLock::new(HashMap::new()),
            stats: StatsTable::new(),
        }
    }

    /// The exponential backoff schedule for one call.
    ///
    /// Yields `max_attempts - 1` delays: the initial attempt consumes no
    /// delay, each subsequent retry waits the next (doubling, capped) delay.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.settings.initial_delay_ms)
            .factor(self.settings.factor)
            .max_delay(self.settings.max_delay)
            .take(self.settings.max_attempts.saturating_sub(1))
    }

    /// Runs `operation` with retry, backoff, and circuit-breaker protection.
    ///
    /// The operation is retried only while its error is a transient class
    /// (network, server, browser, connection, rate-limit); auth, client, and
    /// validation errors fail immediately. If the operation's circuit is open
    /// the call fails fast without invoking the operation at all.
    ///
    /// # Arguments
    ///
    /// * `operation_name` - Stable name keying the circuit breaker and stats
    /// * `default_kind` - Error class reported for failures the manager
    ///   itself produces (circuit open)
    /// * `operation` - Factory producing one attempt's future per invocation
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation_name: &str,
        default_kind: ErrorKind,
        operation: F,
    ) -> CoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let breaker = self.breaker_for(operation_name).await;

        if !breaker.call_permitted().await {
            let err = CoreError::new(
                default_kind,
                format!("circuit open for \"{operation_name}\", failing fast"),
            );
            log::warn!("{err}");
            self.stats.record(operation_name, false, 0, 0).await;
            return Err(err);
        }

        let start = std::time::Instant::now();
        let attempts = AtomicU32::new(0);

        let result = RetryIf::spawn(
            self.backoff(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                operation()
            },
            |err: &CoreError| {
                let retriable = err.is_retriable();
                if retriable {
                    log::debug!("Retriable failure in \"{operation_name}\": {err}");
                }
                retriable
            },
        )
        .await;

        let attempt_count = attempts.load(Ordering::SeqCst);
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                breaker.record_success().await;
                self.stats
                    .record(operation_name, true, attempt_count, duration_ms)
                    .await;
            }
            Err(err) => {
                breaker.record_failure().await;
                self.stats
                    .record(operation_name, false, attempt_count, duration_ms)
                    .await;
                log::warn!(
                    "Operation \"{operation_name}\" failed after {attempt_count} attempt(s): {err}"
                );
            }
        }

        result
    }

    /// Runs a batch of operations with bounded concurrency.
    ///
    /// Results are returned in submission order. With `fail_fast` disabled,
    /// one failing item never aborts unrelated items; with it enabled, the
    /// first failure cancels operations that have not yet started (in-flight
    /// operations run to completion and report their own outcomes).
    pub async fn execute_batch<T, F, Fut>(
        &self,
        operations: Vec<F>,
        options: &BatchOptions,
    ) -> Vec<CoreResult<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let abort = CancellationToken::new();

        let tasks = operations.into_iter().map(|operation| {
            let semaphore = Arc::clone(&semaphore);
            let abort = abort.clone();
            let timeout = options.timeout;
            let fail_fast = options.fail_fast;
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(CoreError::Connection(
                            "batch semaphore closed before operation ran".to_string(),
                        ))
                    }
                };

                if abort.is_cancelled() {
                    return Err(CoreError::validation(
                        "batch aborted after an earlier failure",
                    ));
                }

                let result = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, operation()).await {
                        Ok(result) => result,
                        Err(_) => Err(CoreError::Network(format!(
                            "batch operation timed out after {}ms",
                            limit.as_millis()
                        ))),
                    },
                    None => operation().await,
                };

                if fail_fast && result.is_err() {
                    abort.cancel();
                }
                result
            }
        });

        futures::future::join_all(tasks).await
    }

    /// Current statistics for every operation this manager has executed,
    /// plus the names of operations with an open circuit.
    pub async fn stats_snapshot(&self) -> StatsSnapshot {
        let operations = self.stats.snapshot().await;
        let mut open_circuits = Vec::new();
        for (name, breaker) in self.breakers.read().await.iter() {
            if breaker.state().await == CircuitState::Open {
                open_circuits.push(name.clone());
            }
        }
        open_circuits.sort();
        StatsSnapshot {
            operations,
            open_circuits,
        }
    }

    /// Aggregate health derived from the current snapshot.
    pub async fn health(&self) -> HealthStatus {
        self.stats_snapshot().await.health()
    }

    async fn breaker_for(&self, operation_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(operation_name) {
            return Arc::clone(breaker);
        }
        let mut breakers = self.breakers.write().await;
        Arc::clone(breakers.entry(operation_name.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::with_settings(
                self.settings.circuit_threshold,
                self.settings.circuit_cooldown,
            ))
        }))
    }
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new(RetrySettings::default())
    }
}
