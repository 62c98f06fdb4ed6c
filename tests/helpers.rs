// Shared test helpers: a mocked browser automation API, a recording ads
// client, and tracking-configuration builders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use changelink::ads::{
    AdUpdateRequest, AdsApiClient, AdsApiIntegration, AdsCredentials, AdsSettings,
};
use changelink::browser::{BrowserAutomationClient, BrowserClientSettings};
use changelink::error_handling::{CoreError, CoreResult, ProcessingStats};
use changelink::extraction::{
    ExtractionSettings, FinalUrlHeuristics, HeuristicConfig, UrlExtractionEngine,
};
use changelink::mapping::AdMappingEngine;
use changelink::notify::{ExecutionNotification, NotificationSink};
use changelink::retry::{RetryManager, RetrySettings};
use changelink::storage::MemoryKeyValueStore;
use changelink::workflow::{WorkflowOrchestrator, WorkflowSettings};
use changelink::{AdMappingEntry, TrackingConfiguration};

/// Mounts the happy-path browser automation API on a mock server:
/// an active environment `env1`, successful session start/stop, and an
/// inactive status after stops.
#[allow(dead_code)]
pub async fn mount_browser_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/environment/detail"))
        .and(query_param("environment_id", "env1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {"id": "env1", "name": "profile-1", "status": "Active"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/browser/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {"environment_id": "env1", "debug_port": "9222"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/browser/stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": null
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/browser/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "msg": "success",
            "data": {"status": "Inactive"}
        })))
        .mount(server)
        .await;
}

/// Mounts an affiliate link at `/deal` that redirects to a landing page
/// carrying tracking-style parameters, so the final-URL heuristic accepts it.
#[allow(dead_code)]
pub async fn mount_redirect_chain(server: &MockServer) {
    let landing = format!(
        "{}/landing?utm_source=aff&gclid=abc123&sub_id=77",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/deal"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", landing.as_str()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>landing</html>"))
        .mount(server)
        .await;
}

/// Ads client double that records every update instead of calling anywhere.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingAdsClient {
    /// (customer_id, request) per applied update.
    pub updates: Mutex<Vec<(String, AdUpdateRequest)>>,
    /// Ad ids whose update should fail.
    pub failing_ads: Vec<String>,
}

#[async_trait]
impl AdsApiClient for RecordingAdsClient {
    async fn validate_access(
        &self,
        _credentials: &AdsCredentials,
        _customer_id: &str,
    ) -> CoreResult<()> {
        Ok(())
    }

    async fn get_ad_final_url(
        &self,
        _credentials: &AdsCredentials,
        _customer_id: &str,
        _ad_id: &str,
    ) -> CoreResult<Option<String>> {
        Ok(Some("https://old.example.com/landing".to_string()))
    }

    async fn set_ad_final_url(
        &self,
        _credentials: &AdsCredentials,
        customer_id: &str,
        request: &AdUpdateRequest,
    ) -> CoreResult<()> {
        if self.failing_ads.contains(&request.ad_id) {
            return Err(CoreError::Server(format!(
                "injected failure for ad {}",
                request.ad_id
            )));
        }
        self.updates
            .lock()
            .await
            .push((customer_id.to_string(), request.clone()));
        Ok(())
    }
}

/// Notification sink double that counts deliveries, records the reported
/// status, and can fail on demand.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingNotifier {
    pub sent: std::sync::atomic::AtomicUsize,
    pub fail: bool,
    pub last_status: Mutex<Option<String>>,
}

#[async_trait]
impl NotificationSink for CountingNotifier {
    async fn send_summary(&self, notification: &ExecutionNotification) -> CoreResult<()> {
        if self.fail {
            return Err(CoreError::Network("sink unreachable".to_string()));
        }
        *self.last_status.lock().await = Some(notification.status.clone());
        self.sent
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Retry settings with millisecond backoff, for fast tests.
#[allow(dead_code)]
pub fn fast_retry_settings() -> RetrySettings {
    RetrySettings {
        max_attempts: 2,
        initial_delay_ms: 1,
        factor: 1,
        max_delay: Duration::from_millis(5),
        circuit_threshold: 10,
        circuit_cooldown: Duration::from_millis(100),
    }
}

/// A tracking configuration resolving one `/deal` link against `base`
/// (the mock server), with two executions mapped one-to-one onto two ads.
#[allow(dead_code)]
pub fn tracking_configuration(base: &str) -> TrackingConfiguration {
    let original_url = format!("{base}/deal");
    TrackingConfiguration {
        id: "cfg1".to_string(),
        name: "spring campaign".to_string(),
        environment_id: "env1".to_string(),
        original_urls: vec![original_url.clone()],
        repeat_count: 2,
        accounts: vec![changelink::ads::AdsAccount {
            account_id: "acct1".to_string(),
            customer_id: "123-456".to_string(),
            credentials: AdsCredentials {
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "refresh".to_string(),
                developer_token: None,
            },
        }],
        ad_mappings: HashMap::from([(
            original_url,
            vec![
                AdMappingEntry {
                    ad_id: "ad1".to_string(),
                    execution_number: 1,
                    campaign_id: "camp1".to_string(),
                    ad_group_id: "group1".to_string(),
                },
                AdMappingEntry {
                    ad_id: "ad2".to_string(),
                    execution_number: 2,
                    campaign_id: "camp1".to_string(),
                    ad_group_id: "group1".to_string(),
                },
            ],
        )]),
        notify: true,
        last_executed: None,
        status: None,
    }
}

/// Components wired for one orchestrator test.
#[allow(dead_code)]
pub struct TestHarness {
    pub orchestrator: WorkflowOrchestrator,
    pub ads_client: Arc<RecordingAdsClient>,
    pub notifier: Arc<CountingNotifier>,
    pub store: Arc<MemoryKeyValueStore>,
}

/// Builds a full orchestrator against the mock browser API at `server_uri`,
/// with instant delays so tests run fast.
#[allow(dead_code)]
pub fn build_harness(server_uri: &str, ads_client: Arc<RecordingAdsClient>) -> TestHarness {
    build_harness_with_notifier(server_uri, ads_client, Arc::new(CountingNotifier::default()))
}

/// Same as [`build_harness`], with a caller-provided notification sink.
#[allow(dead_code)]
pub fn build_harness_with_notifier(
    server_uri: &str,
    ads_client: Arc<RecordingAdsClient>,
    notifier: Arc<CountingNotifier>,
) -> TestHarness {
    let retry = Arc::new(RetryManager::new(fast_retry_settings()));
    let stats = Arc::new(ProcessingStats::new());

    let browser = Arc::new(BrowserAutomationClient::new(
        reqwest::Client::new(),
        BrowserClientSettings {
            base_url: server_uri.to_string(),
            stop_settle: Duration::from_millis(5),
            recovery_wait: Duration::from_millis(5),
            ..Default::default()
        },
        Arc::clone(&retry),
    ));

    let nav_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build navigation client");
    let heuristics = FinalUrlHeuristics::from_config(&HeuristicConfig::default())
        .expect("default heuristics must compile");
    let extraction = Arc::new(UrlExtractionEngine::new(
        browser,
        nav_client,
        heuristics,
        ExtractionSettings {
            base_delay: Duration::from_millis(5),
            jitter: Duration::from_millis(5),
            ..Default::default()
        },
        stats,
    ));

    let mapping = Arc::new(AdMappingEngine::new());
    let ads = Arc::new(AdsApiIntegration::new(
        Arc::clone(&ads_client) as Arc<dyn AdsApiClient>,
        Arc::clone(&retry),
        Arc::clone(&mapping),
        AdsSettings {
            chunk_delay: Duration::from_millis(5),
            ..Default::default()
        },
    ));

    let store = Arc::new(MemoryKeyValueStore::new());

    let orchestrator = WorkflowOrchestrator::new(
        extraction,
        mapping,
        ads,
        Arc::clone(&store) as Arc<dyn changelink::storage::KeyValueStore>,
        Arc::clone(&notifier) as Arc<dyn NotificationSink>,
        WorkflowSettings::default(),
    );

    TestHarness {
        orchestrator,
        ads_client,
        notifier,
        store,
    }
}
