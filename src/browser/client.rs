//! Typed client for the browser automation API.
//!
//! Wraps the remote profile-management tool's REST endpoints (environment
//! CRUD, browser session start/stop/status, proxy and group queries). Every
//! call goes through the [`RetryManager`]; GET responses are cached with a
//! short per-endpoint TTL and mutating calls invalidate the entries they
//! affect.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    BROWSER_RECOVERY_WAIT, BROWSER_START_TIMEOUT, BROWSER_STOP_SETTLE, CACHE_TTL_DEFAULT,
    CACHE_TTL_LIST, CACHE_TTL_METADATA, ENVIRONMENT_BATCH_CONCURRENCY, HTTP_TIMEOUT,
};
use crate::error_handling::{
    categorize_api_code, categorize_reqwest_error, CoreError, CoreResult, ErrorKind,
};
use crate::retry::RetryManager;

use super::cache::ResponseCache;
use super::types::{
    ApiEnvelope, BrowserSession, Environment, EnvironmentGroup, EnvironmentSpec, KernelVersion,
    PagedList, ProxyStatus, SessionStatus, SessionStatusPayload,
};

pub(crate) const EP_ENVIRONMENT_LIST: &str = "/api/v1/environment/list";
pub(crate) const EP_ENVIRONMENT_DETAIL: &str = "/api/v1/environment/detail";
pub(crate) const EP_ENVIRONMENT_CREATE: &str = "/api/v1/environment/create";
pub(crate) const EP_ENVIRONMENT_UPDATE: &str = "/api/v1/environment/update";
pub(crate) const EP_ENVIRONMENT_DELETE: &str = "/api/v1/environment/delete";
pub(crate) const EP_BROWSER_START: &str = "/api/v1/browser/start";
pub(crate) const EP_BROWSER_STOP: &str = "/api/v1/browser/stop";
pub(crate) const EP_BROWSER_STATUS: &str = "/api/v1/browser/status";
pub(crate) const EP_PROXY_CHECK: &str = "/api/v1/environment/proxy-check";
pub(crate) const EP_GROUP_LIST: &str = "/api/v1/group/list";
pub(crate) const EP_KERNEL_LIST: &str = "/api/v1/kernel/list";

/// Tunables for the automation client.
#[derive(Debug, Clone)]
pub struct BrowserClientSettings {
    /// Base URL of the automation API (local tool).
    pub base_url: String,
    /// Timeout for ordinary API calls.
    pub http_timeout: Duration,
    /// Timeout for browser session starts (environment boot can be slow).
    pub start_timeout: Duration,
    /// Wait after a stop before re-checking session status.
    pub stop_settle: Duration,
    /// Wait inside the start-recovery procedure between stop and restart.
    pub recovery_wait: Duration,
    /// Concurrency for batch environment start/stop.
    pub batch_concurrency: usize,
}

impl Default for BrowserClientSettings {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_AUTOMATION_API_URL.to_string(),
            http_timeout: HTTP_TIMEOUT,
            start_timeout: BROWSER_START_TIMEOUT,
            stop_settle: BROWSER_STOP_SETTLE,
            recovery_wait: BROWSER_RECOVERY_WAIT,
            batch_concurrency: ENVIRONMENT_BATCH_CONCURRENCY,
        }
    }
}

/// Client for the remote browser-profile-management API.
pub struct BrowserAutomationClient {
    http: reqwest::Client,
    settings: BrowserClientSettings,
    retry: Arc<RetryManager>,
    cache: ResponseCache,
}

impl BrowserAutomationClient {
    pub fn new(
        http: reqwest::Client,
        settings: BrowserClientSettings,
        retry: Arc<RetryManager>,
    ) -> Self {
        BrowserAutomationClient {
            http,
            settings,
            retry,
            cache: ResponseCache::new(),
        }
    }

    /// The response cache, for lifecycle control (cleanup task, shutdown).
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub(crate) fn settings(&self) -> &BrowserClientSettings {
        &self.settings
    }

    pub(crate) fn retry(&self) -> &Arc<RetryManager> {
        &self.retry
    }

    /// Error class for an endpoint: browser start/stop report browser
    /// errors, list endpoints report connection errors, everything else is a
    /// plain network error.
    fn classify(endpoint: &str) -> ErrorKind {
        if endpoint == EP_BROWSER_START || endpoint == EP_BROWSER_STOP {
            ErrorKind::Browser
        } else if endpoint.ends_with("/list") {
            ErrorKind::Connection
        } else {
            ErrorKind::Network
        }
    }

    fn cache_ttl(endpoint: &str) -> Duration {
        if endpoint == EP_KERNEL_LIST {
            CACHE_TTL_METADATA
        } else if endpoint.ends_with("/list") {
            CACHE_TTL_LIST
        } else {
            CACHE_TTL_DEFAULT
        }
    }

    fn cache_key(endpoint: &str, params: &[(&str, String)]) -> String {
        let mut key = format!("GET {endpoint}");
        for (name, value) in params {
            key.push_str(&format!(" {name}={value}"));
        }
        key
    }

    fn unwrap_envelope(
        envelope: ApiEnvelope<serde_json::Value>,
        kind: ErrorKind,
    ) -> CoreResult<serde_json::Value> {
        if envelope.code != 0 {
            return Err(categorize_api_code(envelope.code, &envelope.msg, kind));
        }
        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    }

    /// Issues a cached GET against the automation API.
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> CoreResult<serde_json::Value> {
        let key = Self::cache_key(endpoint, params);
        if let Some(cached) = self.cache.get(&key).await {
            log::trace!("Cache hit for {key}");
            return Ok(cached);
        }

        let kind = Self::classify(endpoint);
        let url = format!("{}{}", self.settings.base_url, endpoint);
        let operation_name = format!("GET {endpoint}");
        let timeout = self.settings.http_timeout;

        let data = self
            .retry
            .execute_with_retry(&operation_name, kind, || async {
                let response = self
                    .http
                    .get(&url)
                    .query(params)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                let response = response
                    .error_for_status()
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                let envelope: ApiEnvelope<serde_json::Value> = response
                    .json()
                    .await
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                Self::unwrap_envelope(envelope, kind)
            })
            .await?;

        self.cache.insert(&key, data.clone(), Self::cache_ttl(endpoint)).await;
        Ok(data)
    }

    /// Issues a POST and invalidates the cache prefixes the mutation affects.
    async fn post_json(
        &self,
        endpoint: &str,
        body: serde_json::Value,
        invalidate: &[&str],
        timeout: Duration,
    ) -> CoreResult<serde_json::Value> {
        let kind = Self::classify(endpoint);
        let url = format!("{}{}", self.settings.base_url, endpoint);
        let operation_name = format!("POST {endpoint}");

        let data = self
            .retry
            .execute_with_retry(&operation_name, kind, || async {
                let response = self
                    .http
                    .post(&url)
                    .json(&body)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                let response = response
                    .error_for_status()
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                let envelope: ApiEnvelope<serde_json::Value> = response
                    .json()
                    .await
                    .map_err(|e| categorize_reqwest_error(&e, kind))?;
                Self::unwrap_envelope(envelope, kind)
            })
            .await?;

        for prefix in invalidate {
            self.cache.invalidate_prefix(&format!("GET {prefix}")).await;
        }
        Ok(data)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        data: serde_json::Value,
    ) -> CoreResult<T> {
        serde_json::from_value(data).map_err(|e| {
            CoreError::new(
                Self::classify(endpoint),
                format!("invalid response payload from {endpoint}: {e}"),
            )
        })
    }

    /// Lists environments, paged.
    pub async fn list_environments(
        &self,
        page: u32,
        page_size: u32,
    ) -> CoreResult<PagedList<Environment>> {
        let data = self
            .get_json(
                EP_ENVIRONMENT_LIST,
                &[("page", page.to_string()), ("page_size", page_size.to_string())],
            )
            .await?;
        Self::decode(EP_ENVIRONMENT_LIST, data)
    }

    /// Fetches one environment; `Ok(None)` when it does not exist.
    pub async fn get_environment(&self, environment_id: &str) -> CoreResult<Option<Environment>> {
        let data = self
            .get_json(
                EP_ENVIRONMENT_DETAIL,
                &[("environment_id", environment_id.to_string())],
            )
            .await;
        match data {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(value) => Ok(Some(Self::decode(EP_ENVIRONMENT_DETAIL, value)?)),
            Err(err) if err.message().to_lowercase().contains("not found") => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates an environment and returns it.
    pub async fn create_environment(&self, spec: &EnvironmentSpec) -> CoreResult<Environment> {
        let body = serde_json::to_value(spec)
            .map_err(|e| CoreError::validation(format!("unserializable environment spec: {e}")))?;
        let data = self
            .post_json(
                EP_ENVIRONMENT_CREATE,
                body,
                &[EP_ENVIRONMENT_LIST, EP_ENVIRONMENT_DETAIL],
                self.settings.http_timeout,
            )
            .await?;
        Self::decode(EP_ENVIRONMENT_CREATE, data)
    }

    /// Updates an environment in place.
    pub async fn update_environment(
        &self,
        environment_id: &str,
        spec: &EnvironmentSpec,
    ) -> CoreResult<()> {
        let mut body = serde_json::to_value(spec)
            .map_err(|e| CoreError::validation(format!("unserializable environment spec: {e}")))?;
        body["environment_id"] = serde_json::Value::String(environment_id.to_string());
        self.post_json(
            EP_ENVIRONMENT_UPDATE,
            body,
            &[EP_ENVIRONMENT_LIST, EP_ENVIRONMENT_DETAIL],
            self.settings.http_timeout,
        )
        .await?;
        Ok(())
    }

    /// Deletes an environment.
    pub async fn delete_environment(&self, environment_id: &str) -> CoreResult<()> {
        self.post_json(
            EP_ENVIRONMENT_DELETE,
            serde_json::json!({ "environment_id": environment_id }),
            &[EP_ENVIRONMENT_LIST, EP_ENVIRONMENT_DETAIL],
            self.settings.http_timeout,
        )
        .await?;
        Ok(())
    }

    /// Starts a browser session bound to an environment.
    ///
    /// Uses the longer start timeout; a cold profile can take tens of
    /// seconds to boot.
    pub async fn start_browser(&self, environment_id: &str) -> CoreResult<BrowserSession> {
        let data = self
            .post_json(
                EP_BROWSER_START,
                serde_json::json!({ "environment_id": environment_id }),
                &[EP_BROWSER_STATUS],
                self.settings.start_timeout,
            )
            .await?;
        let mut session: BrowserSession = Self::decode(EP_BROWSER_START, data)?;
        if session.environment_id.is_empty() {
            session.environment_id = environment_id.to_string();
        }
        Ok(session)
    }

    /// Stops the browser session bound to an environment.
    pub async fn stop_browser(&self, environment_id: &str) -> CoreResult<()> {
        self.post_json(
            EP_BROWSER_STOP,
            serde_json::json!({ "environment_id": environment_id }),
            &[EP_BROWSER_STATUS],
            self.settings.http_timeout,
        )
        .await?;
        Ok(())
    }

    /// Queries whether a session is running for an environment.
    pub async fn browser_status(&self, environment_id: &str) -> CoreResult<SessionStatus> {
        let data = self
            .get_json(
                EP_BROWSER_STATUS,
                &[("environment_id", environment_id.to_string())],
            )
            .await?;
        let payload: SessionStatusPayload = Self::decode(EP_BROWSER_STATUS, data)?;
        Ok(payload.status)
    }

    /// Checks the proxy configuration of an environment.
    pub async fn check_proxy(&self, environment_id: &str) -> CoreResult<ProxyStatus> {
        let data = self
            .get_json(
                EP_PROXY_CHECK,
                &[("environment_id", environment_id.to_string())],
            )
            .await?;
        Self::decode(EP_PROXY_CHECK, data)
    }

    /// Lists environment groups.
    pub async fn list_groups(&self) -> CoreResult<Vec<EnvironmentGroup>> {
        let data = self.get_json(EP_GROUP_LIST, &[]).await?;
        let page: PagedList<EnvironmentGroup> = Self::decode(EP_GROUP_LIST, data)?;
        Ok(page.list)
    }

    /// Lists installable browser kernel versions (long-TTL metadata).
    pub async fn list_kernel_versions(&self) -> CoreResult<Vec<KernelVersion>> {
        let data = self.get_json(EP_KERNEL_LIST, &[]).await?;
        let page: PagedList<KernelVersion> = Self::decode(EP_KERNEL_LIST, data)?;
        Ok(page.list)
    }
}
