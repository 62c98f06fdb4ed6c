//! Circuit breaker for outbound operations.
//!
//! Prevents resource exhaustion when a remote operation fails repeatedly.
//! After N consecutive failures the circuit opens and calls fail fast until a
//! cooldown expires; the first call after the cooldown runs as a half-open
//! probe whose outcome decides whether the circuit closes or re-opens.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::{CIRCUIT_COOLDOWN, CIRCUIT_FAILURE_THRESHOLD};

/// State of one operation's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    Closed,
    /// Calls fail fast until the cooldown expires.
    Open,
    /// Cooldown expired; one probe call is in flight.
    HalfOpen,
}

/// Circuit breaker for a single named operation.
///
/// Keyed per operation name by [`super::RetryManager`]; safe to share across
/// tasks behind an `Arc`.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    failure_count: AtomicU32,
    state: RwLock<BreakerState>,
}

struct BreakerState {
    state: CircuitState,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Creates a circuit breaker with the default threshold and cooldown.
    pub fn new() -> Self {
        Self::with_settings(CIRCUIT_FAILURE_THRESHOLD, CIRCUIT_COOLDOWN)
    }

    /// Creates a circuit breaker with custom settings.
    ///
    /// # Arguments
    ///
    /// * `failure_threshold` - Consecutive failures before the circuit opens
    /// * `cooldown` - How long to fail fast before allowing a probe
    pub fn with_settings(failure_threshold: u32, cooldown: Duration) -> Self {
        CircuitBreaker {
            failure_threshold,
            cooldown,
            failure_count: AtomicU32::new(0),
            state: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                opened_at: None,
            }),
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// Returns `false` while the circuit is open and the cooldown has not
    /// expired. When the cooldown has expired the circuit transitions to
    /// half-open and this returns `true`, admitting the probe call.
    pub async fn call_permitted(&self) -> bool {
        {
            let state = self.state.read().await;
            match state.state {
                CircuitState::Closed | CircuitState::HalfOpen => return true,
                CircuitState::Open => {
                    let expired = state
                        .opened_at
                        .map(|t| t.elapsed() >= self.cooldown)
                        .unwrap_or(true);
                    if !expired {
                        return false;
                    }
                }
            }
        }

        // Cooldown expired: move to half-open and admit the probe. Re-check
        // under the write lock since another task may have won the race.
        let mut state = self.state.write().await;
        if state.state == CircuitState::Open {
            let expired = state
                .opened_at
                .map(|t| t.elapsed() >= self.cooldown)
                .unwrap_or(true);
            if expired {
                state.state = CircuitState::HalfOpen;
                log::info!("Circuit breaker: cooldown expired, admitting half-open probe");
            } else {
                return false;
            }
        }
        true
    }

    /// Records a successful call.
    ///
    /// Resets the failure count; a half-open probe success closes the circuit.
    pub async fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if state.state != CircuitState::Closed {
            log::info!("Circuit breaker: circuit closed after successful call");
            state.state = CircuitState::Closed;
            state.opened_at = None;
        }
    }

    /// Records a failed call.
    ///
    /// In the closed state, increments the consecutive-failure count and opens
    /// the circuit at the threshold. A half-open probe failure re-opens the
    /// circuit and restarts the cooldown.
    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
                log::warn!("Circuit breaker: half-open probe failed, circuit re-opened");
            }
            CircuitState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.failure_threshold {
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                    log::error!(
                        "Circuit breaker: circuit opened after {} consecutive failures (cooldown: {}s)",
                        count,
                        self.cooldown.as_secs()
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// The current state (for monitoring).
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }

    /// The current consecutive-failure count (for monitoring).
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = CircuitBreaker::with_settings(3, Duration::from_millis(100));

        cb.record_failure().await;
        cb.record_failure().await;
        assert!(cb.call_permitted().await);
        assert_eq!(cb.failure_count(), 2);

        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.call_permitted().await);
    }

    #[tokio::test]
    async fn test_resets_on_success() {
        let cb = CircuitBreaker::with_settings(3, Duration::from_millis(100));

        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;
        assert_eq!(cb.failure_count(), 0);
        assert!(cb.call_permitted().await);
    }

    #[tokio::test]
    async fn test_half_open_probe_closes_on_success() {
        let cb = CircuitBreaker::with_settings(2, Duration::from_millis(50));

        cb.record_failure().await;
        cb.record_failure().await;
        assert!(!cb.call_permitted().await);

        sleep(Duration::from_millis(60)).await;

        // Cooldown expired: the probe is admitted in half-open state.
        assert!(cb.call_permitted().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_reopens_on_failure() {
        let cb = CircuitBreaker::with_settings(2, Duration::from_millis(50));

        cb.record_failure().await;
        cb.record_failure().await;
        sleep(Duration::from_millis(60)).await;
        assert!(cb.call_permitted().await);

        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.call_permitted().await);
    }
}
