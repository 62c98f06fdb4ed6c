//! URL extraction engine.
//!
//! Resolves an affiliate link to its final destination by driving a browser
//! session through the link's redirect chain. Each configured execution is an
//! independent resolution separated by a jittered delay; executions of one
//! URL are strictly sequential because they share one browser environment.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use url::Url;

use crate::app::validate_and_normalize_url;
use crate::browser::BrowserAutomationClient;
use crate::config::{
    EXECUTION_DELAY_BASE_MS, EXECUTION_DELAY_JITTER_MS, EXTRACTION_GROUP_DELAY, MAX_REDIRECT_HOPS,
};
use crate::error_handling::{
    categorize_reqwest_error, CoreError, CoreResult, ErrorKind, ProcessingStats,
};

use super::heuristics::FinalUrlHeuristics;
use super::types::{
    BatchExtractionOutcome, BatchExtractionRequest, ExtractionRequest, ExtractionSummary,
    LinkResult,
};

/// Tunables for the extraction engine.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    /// Fixed component of the inter-execution delay.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to the delay.
    pub jitter: Duration,
    /// Maximum redirect hops followed per navigation.
    pub max_redirect_hops: usize,
    /// Delay between concurrency groups in batch mode.
    pub group_delay: Duration,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(EXECUTION_DELAY_BASE_MS),
            jitter: Duration::from_millis(EXECUTION_DELAY_JITTER_MS),
            max_redirect_hops: MAX_REDIRECT_HOPS,
            group_delay: EXTRACTION_GROUP_DELAY,
        }
    }
}

/// Drives browser sessions to resolve affiliate links.
pub struct UrlExtractionEngine {
    browser: Arc<BrowserAutomationClient>,
    /// HTTP client with redirects disabled, for manual chain tracking.
    nav_client: reqwest::Client,
    heuristics: FinalUrlHeuristics,
    settings: ExtractionSettings,
    stats: Arc<ProcessingStats>,
}

impl UrlExtractionEngine {
    pub fn new(
        browser: Arc<BrowserAutomationClient>,
        nav_client: reqwest::Client,
        heuristics: FinalUrlHeuristics,
        settings: ExtractionSettings,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        UrlExtractionEngine {
            browser,
            nav_client,
            heuristics,
            settings,
            stats,
        }
    }

    /// Resolves one original URL, producing one [`LinkResult`] per execution.
    ///
    /// Executions run strictly sequentially with a jittered delay before
    /// every execution after the first. Within an execution, up to
    /// `max_retries` attempts are made; an attempt validates the
    /// environment, starts a session, follows the redirect chain, and always
    /// stops the session again before returning.
    ///
    /// # Errors
    ///
    /// Only request validation fails the call as a whole (empty environment
    /// id, invalid URL, zero repeat count). Resolution failures are encoded
    /// in the returned results.
    pub async fn extract_final_url(
        &self,
        request: &ExtractionRequest,
    ) -> CoreResult<Vec<LinkResult>> {
        if request.environment_id.trim().is_empty() {
            return Err(CoreError::validation("environment id is empty"));
        }
        if request.repeat_count == 0 {
            return Err(CoreError::validation("repeat count must be at least 1"));
        }
        // Navigation uses the normalized form; results keep the caller's
        // exact original string, which keys the ad-mapping lookups later.
        let navigation_url = validate_and_normalize_url(&request.original_url).ok_or_else(|| {
            CoreError::validation(format!("invalid original URL: {}", request.original_url))
        })?;
        let max_retries = request.max_retries.max(1);

        let mut results = Vec::with_capacity(request.repeat_count as usize);
        // Best candidate seen so far, retained across executions.
        let mut best_candidate: Option<Url> = None;

        for execution in 1..=request.repeat_count {
            if execution > 1 {
                self.inter_execution_delay().await;
            }
            let result = self
                .run_execution(
                    &request.environment_id,
                    &navigation_url,
                    &request.original_url,
                    execution,
                    max_retries,
                    &mut best_candidate,
                )
                .await;
            log::info!(
                "Execution {}/{} of {}: success={} validated={}",
                execution,
                request.repeat_count,
                request.original_url,
                result.success,
                result.validated
            );
            results.push(result);
        }

        Ok(results)
    }

    /// Resolves several URLs in fixed-size concurrency groups.
    ///
    /// Groups run one after another with a delay in between; inside a group
    /// the URLs are resolved concurrently. A failed extraction becomes a set
    /// of failed [`LinkResult`]s instead of aborting the batch.
    pub async fn extract_urls_batch(
        &self,
        request: &BatchExtractionRequest,
    ) -> BatchExtractionOutcome {
        let start = std::time::Instant::now();
        let concurrency = request.concurrency.max(1);
        let repeat_count = request.repeat_count.max(1);
        let mut results: Vec<LinkResult> = Vec::new();

        for (group_index, group) in request.urls.chunks(concurrency).enumerate() {
            if group_index > 0 {
                sleep(self.settings.group_delay).await;
            }
            log::debug!(
                "Extraction group {} ({} URL(s), concurrency {})",
                group_index + 1,
                group.len(),
                concurrency
            );

            let group_futures = group.iter().map(|url| {
                let extraction = ExtractionRequest {
                    environment_id: request.environment_id.clone(),
                    original_url: url.clone(),
                    repeat_count,
                    max_retries: crate::config::EXTRACTION_MAX_RETRIES,
                };
                async move { (url.clone(), self.extract_final_url(&extraction).await) }
            });

            for (url, outcome) in futures::future::join_all(group_futures).await {
                match outcome {
                    Ok(mut link_results) => results.append(&mut link_results),
                    Err(err) => {
                        log::warn!("Batch extraction of {url} failed: {err}");
                        for execution in 1..=repeat_count {
                            results.push(LinkResult::failed(&url, execution, err.to_string(), 0, 0));
                        }
                    }
                }
            }
        }

        let summary = Self::summarize(&request.urls, &results, start.elapsed());
        BatchExtractionOutcome { results, summary }
    }

    /// One execution: up to `max_retries` attempts, then a best-so-far
    /// fallback when no attempt produced a validated destination.
    async fn run_execution(
        &self,
        environment_id: &str,
        navigation_url: &str,
        original_url: &str,
        execution: u32,
        max_retries: u32,
        best_candidate: &mut Option<Url>,
    ) -> LinkResult {
        let start = std::time::Instant::now();
        let mut last_error: Option<CoreError> = None;
        let mut last_chain: Vec<String> = Vec::new();
        let mut attempt = 0;

        while attempt < max_retries {
            attempt += 1;
            match self.run_attempt(environment_id, navigation_url).await {
                Ok(chain) => {
                    let candidate = chain
                        .last()
                        .and_then(|raw| Url::parse(raw).ok());
                    last_chain = chain;
                    let Some(candidate) = candidate else {
                        last_error = Some(CoreError::Browser(
                            "navigation produced no parseable URL".to_string(),
                        ));
                        continue;
                    };

                    if self
                        .heuristics
                        .is_better_candidate(&candidate, best_candidate.as_ref())
                    {
                        *best_candidate = Some(candidate.clone());
                    }

                    if self.heuristics.is_final_destination(&candidate) {
                        return LinkResult::resolved(
                            original_url,
                            execution,
                            &candidate,
                            std::mem::take(&mut last_chain),
                            true,
                            attempt,
                            start.elapsed().as_millis() as u64,
                        );
                    }
                    log::debug!(
                        "Attempt {attempt}: {candidate} not confirmed as final destination"
                    );
                }
                Err(err) => {
                    self.stats.increment(err.kind());
                    log::warn!(
                        "Attempt {attempt} for {original_url} (execution {execution}) failed: {err}"
                    );
                    last_error = Some(err);
                }
            }
        }

        // No attempt produced a validated destination. Return the best
        // candidate seen so far, marked unvalidated, rather than failing
        // outright; fail only when there is no candidate at all.
        if let Some(best) = best_candidate.as_ref() {
            return LinkResult::resolved(
                original_url,
                execution,
                best,
                last_chain,
                false,
                attempt,
                start.elapsed().as_millis() as u64,
            );
        }
        LinkResult::failed(
            original_url,
            execution,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no final URL candidate found".to_string()),
            attempt,
            start.elapsed().as_millis() as u64,
        )
    }

    /// One attempt: validate environment, start a session, navigate, and
    /// always stop the session again, success or failure.
    async fn run_attempt(
        &self,
        environment_id: &str,
        navigation_url: &str,
    ) -> CoreResult<Vec<String>> {
        self.browser.validate_environment(environment_id).await?;
        self.browser.smart_start_browser(environment_id).await?;

        let navigation = self.follow_redirect_chain(navigation_url).await;

        // Cleanup is unconditional: the session is stopped on both the
        // success and failure paths before any result is returned.
        if let Err(stop_err) = self.browser.smart_stop_browser(environment_id, false).await {
            log::warn!("Session stop after navigation failed: {stop_err}");
        }

        navigation
    }

    /// Follows the redirect chain of a URL manually, recording every URL
    /// visited. Stops at the first non-redirect response or after the hop
    /// limit.
    async fn follow_redirect_chain(&self, start_url: &str) -> CoreResult<Vec<String>> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = start_url.to_string();

        for _ in 0..self.settings.max_redirect_hops {
            chain.push(current.clone());
            let response = self
                .nav_client
                .get(&current)
                .send()
                .await
                .map_err(|e| categorize_reqwest_error(&e, ErrorKind::Network))?;

            let status = response.status().as_u16();
            if matches!(status, 301 | 302 | 303 | 307 | 308) {
                if let Some(location) = response.headers().get(reqwest::header::LOCATION) {
                    let location = location.to_str().unwrap_or("").to_string();
                    let next = Url::parse(&location)
                        .or_else(|_| {
                            Url::parse(&current).and_then(|base| base.join(&location))
                        })
                        .map_err(|e| {
                            CoreError::Network(format!("unparseable redirect target: {e}"))
                        })?;
                    current = next.to_string();
                    continue;
                }
                log::warn!("Redirect status {status} for {current} without a Location header");
                break;
            }
            break;
        }

        if chain.last() != Some(&current) {
            chain.push(current);
        }
        Ok(chain)
    }

    async fn inter_execution_delay(&self) {
        let jitter_cap = self.settings.jitter.as_millis() as u64;
        let jitter_ms = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        let delay = self.settings.base_delay + Duration::from_millis(jitter_ms);
        log::debug!("Waiting {}ms before next execution", delay.as_millis());
        sleep(delay).await;
    }

    fn summarize(
        urls: &[String],
        results: &[LinkResult],
        elapsed: Duration,
    ) -> ExtractionSummary {
        let successful_urls = urls
            .iter()
            .filter(|url| {
                results
                    .iter()
                    .any(|r| &r.original_url == *url && r.success)
            })
            .count();
        ExtractionSummary {
            total_urls: urls.len(),
            successful_urls,
            failed_urls: urls.len() - successful_urls,
            total_executions: results.len(),
            validated_executions: results.iter().filter(|r| r.validated).count(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}
