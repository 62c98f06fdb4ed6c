// Browser automation client behavior: caching, invalidation, error
// classification, and session recovery.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use changelink::browser::{BrowserAutomationClient, BrowserClientSettings, EnvironmentSpec};
use changelink::retry::{RetryManager, RetrySettings};
use changelink::ErrorKind;

fn client(server_uri: &str, max_attempts: usize) -> BrowserAutomationClient {
    let retry = Arc::new(RetryManager::new(RetrySettings {
        max_attempts,
        initial_delay_ms: 1,
        factor: 1,
        max_delay: Duration::from_millis(2),
        circuit_threshold: 100,
        circuit_cooldown: Duration::from_millis(100),
    }));
    BrowserAutomationClient::new(
        reqwest::Client::new(),
        BrowserClientSettings {
            base_url: server_uri.to_string(),
            stop_settle: Duration::from_millis(5),
            recovery_wait: Duration::from_millis(5),
            ..Default::default()
        },
        retry,
    )
}

async fn requests_to(server: &MockServer, suffix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with(suffix))
        .count()
}

fn active_environment(id: &str) -> serde_json::Value {
    serde_json::json!({
        "code": 0,
        "msg": "success",
        "data": {"id": id, "name": "profile", "status": "Active"}
    })
}

#[tokio::test]
async fn test_get_responses_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_environment("env1")))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 1);
    for _ in 0..3 {
        let env = client.get_environment("env1").await.unwrap().unwrap();
        assert_eq!(env.id, "env1");
    }

    assert_eq!(
        requests_to(&server, "/environment/detail").await,
        1,
        "repeated reads within the TTL must hit the cache"
    );
}

#[tokio::test]
async fn test_mutation_invalidates_cached_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_environment("env1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/environment/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": null
        })))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 1);
    client.get_environment("env1").await.unwrap();
    client
        .update_environment(
            "env1",
            &EnvironmentSpec {
                name: "renamed".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    client.get_environment("env1").await.unwrap();

    assert_eq!(
        requests_to(&server, "/environment/detail").await,
        2,
        "the update must invalidate the cached detail entry"
    );
}

#[tokio::test]
async fn test_auth_errors_are_classified_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 3);
    let err = client.get_environment("env1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(
        requests_to(&server, "/environment/detail").await,
        1,
        "auth failures must not be retried"
    );
}

#[tokio::test]
async fn test_server_errors_are_retried_to_the_attempt_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 3);
    let err = client.get_environment("env1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(requests_to(&server, "/environment/detail").await, 3);
}

#[tokio::test]
async fn test_validate_environment_reports_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .and(query_param("environment_id", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .and(query_param("environment_id", "dormant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {"id": "dormant", "status": "Inactive"}
        })))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 1);

    let missing = client.validate_environment("missing").await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Validation);
    assert!(missing.message().contains("does not exist"));

    let dormant = client.validate_environment("dormant").await.unwrap_err();
    assert_eq!(dormant.kind(), ErrorKind::Validation);
    assert!(dormant.message().contains("Inactive"));
}

#[tokio::test]
async fn test_smart_start_recovers_from_stale_session() {
    let server = MockServer::start().await;

    // First start attempt fails; the retry-after-recovery succeeds.
    Mock::given(method("POST"))
        .and(path("/api/v1/browser/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": -1, "msg": "browser session already exists"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/browser/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": {"environment_id": "env1"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/browser/stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/browser/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": {"status": "Active"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_environment("env1")))
        .mount(&server)
        .await;

    // Single attempt per call so the recovery path runs instead of a retry.
    let client = client(&server.uri(), 1);
    let session = client.smart_start_browser("env1").await.unwrap();
    assert_eq!(session.environment_id, "env1");

    assert_eq!(requests_to(&server, "/browser/start").await, 2);
    assert_eq!(
        requests_to(&server, "/browser/stop").await,
        1,
        "recovery must stop the stale session before restarting"
    );
}

#[tokio::test]
async fn test_batch_start_partitions_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/browser/start"))
        .and(body_partial_json(serde_json::json!({"environment_id": "bad"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": -1, "msg": "browser profile is corrupt"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/browser/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": {"environment_id": "env1"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/browser/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": {"status": "Inactive"}
        })))
        .mount(&server)
        .await;
    // The recovery path re-validates "bad" and finds it missing.
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .and(query_param("environment_id", "bad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0, "msg": "success", "data": null
        })))
        .mount(&server)
        .await;

    let client = client(&server.uri(), 1);
    let partition = client
        .batch_start_browsers(&["env1".to_string(), "bad".to_string()])
        .await;

    assert_eq!(partition.successful, vec!["env1".to_string()]);
    assert_eq!(partition.failed.len(), 1);
    assert_eq!(partition.failed[0].0, "bad");
    assert_eq!(partition.total(), 2);
}
