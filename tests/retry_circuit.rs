// Retry manager properties: circuit breaking and batch failure isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use changelink::retry::{BatchOptions, CircuitState, RetryManager, RetrySettings};
use changelink::{CoreError, ErrorKind};

fn settings(threshold: u32) -> RetrySettings {
    RetrySettings {
        max_attempts: 1,
        initial_delay_ms: 1,
        factor: 1,
        max_delay: Duration::from_millis(2),
        circuit_threshold: threshold,
        circuit_cooldown: Duration::from_millis(80),
    }
}

#[tokio::test]
async fn test_circuit_opens_after_threshold_and_call_counter_stays_flat() {
    let manager = RetryManager::new(settings(3));
    let calls = Arc::new(AtomicUsize::new(0));

    let failing_call = |calls: Arc<AtomicUsize>| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(CoreError::Server("persistent 500".to_string()))
    };

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let _ = manager
            .execute_with_retry("ops.X", ErrorKind::Network, move || {
                failing_call(Arc::clone(&calls))
            })
            .await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // The next call must fail immediately without invoking the operation.
    let calls_clone = Arc::clone(&calls);
    let result = manager
        .execute_with_retry("ops.X", ErrorKind::Network, move || {
            failing_call(Arc::clone(&calls_clone))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(
        calls.load(Ordering::SeqCst),
        3,
        "open circuit must not invoke the underlying operation"
    );

    let snapshot = manager.stats_snapshot().await;
    assert_eq!(snapshot.open_circuits, vec!["ops.X".to_string()]);
}

#[tokio::test]
async fn test_circuit_closes_again_after_cooldown_probe_succeeds() {
    let manager = RetryManager::new(settings(2));

    for _ in 0..2 {
        let _: Result<(), _> = manager
            .execute_with_retry("ops.flaky", ErrorKind::Network, || async {
                Err(CoreError::Network("down".to_string()))
            })
            .await;
    }
    assert!(!manager.stats_snapshot().await.open_circuits.is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;

    // The half-open probe succeeds and closes the circuit.
    let result = manager
        .execute_with_retry("ops.flaky", ErrorKind::Network, || async {
            Ok::<_, CoreError>("recovered")
        })
        .await;
    assert_eq!(result.unwrap(), "recovered");
    assert!(manager.stats_snapshot().await.open_circuits.is_empty());
}

#[tokio::test]
async fn test_batch_without_fail_fast_returns_every_outcome() {
    let manager = RetryManager::new(settings(50));

    let operations: Vec<_> = (0..5)
        .map(|i| {
            move || async move {
                if i == 2 {
                    Err(CoreError::Server("operation #3 always rejects".to_string()))
                } else {
                    Ok(format!("result-{i}"))
                }
            }
        })
        .collect();

    let results = manager
        .execute_batch(
            operations,
            &BatchOptions {
                concurrency: 3,
                timeout: None,
                fail_fast: false,
            },
        )
        .await;

    assert_eq!(results.len(), 5, "no early termination");
    for (i, result) in results.iter().enumerate() {
        if i == 2 {
            assert!(result.is_err(), "index 2 must be the failed item");
        } else {
            assert_eq!(result.as_ref().unwrap(), &format!("result-{i}"));
        }
    }
}

#[tokio::test]
async fn test_auth_errors_are_not_retried() {
    let manager = RetryManager::new(RetrySettings {
        max_attempts: 4,
        ..settings(50)
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = Arc::clone(&calls);
    let result: Result<(), _> = manager
        .execute_with_retry("ops.auth", ErrorKind::Network, move || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Auth("invalid token".to_string()))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_standalone_breaker_state_transitions() {
    use changelink::retry::CircuitBreaker;

    let breaker = CircuitBreaker::with_settings(2, Duration::from_millis(40));
    assert_eq!(breaker.state().await, CircuitState::Closed);

    breaker.record_failure().await;
    breaker.record_failure().await;
    assert_eq!(breaker.state().await, CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(breaker.call_permitted().await);
    assert_eq!(breaker.state().await, CircuitState::HalfOpen);

    breaker.record_failure().await;
    assert_eq!(breaker.state().await, CircuitState::Open);
}
