//! Advertising API integration.
//!
//! Bridges link-resolution results to per-account ad updates: resolves each
//! result's originating URL and execution number to the configured ad
//! mapping, builds the update list, and applies it in chunks with an
//! inter-chunk delay. One account's failure never blocks other accounts.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::{AD_UPDATE_CHUNK_DELAY, AD_UPDATE_CHUNK_SIZE};
use crate::error_handling::{CoreError, CoreResult, ErrorKind};
use crate::extraction::LinkResult;
use crate::mapping::AdMappingEngine;
use crate::models::TrackingConfiguration;
use crate::retry::RetryManager;

use super::client::AdsApiClient;
use super::types::{
    AdUpdateRequest, AdUpdateResult, AdUpdateSummary, AdsAccount, BatchUpdateResult,
};

/// Tunables for ad updates.
#[derive(Debug, Clone)]
pub struct AdsSettings {
    /// Updates applied per chunk.
    pub chunk_size: usize,
    /// Delay between chunks.
    pub chunk_delay: Duration,
    /// Accounts updated concurrently.
    pub account_concurrency: usize,
}

impl Default for AdsSettings {
    fn default() -> Self {
        Self {
            chunk_size: AD_UPDATE_CHUNK_SIZE,
            chunk_delay: AD_UPDATE_CHUNK_DELAY,
            account_concurrency: 2,
        }
    }
}

/// Applies batched final-URL updates to advertising accounts.
pub struct AdsApiIntegration {
    client: Arc<dyn AdsApiClient>,
    retry: Arc<RetryManager>,
    mapping: Arc<AdMappingEngine>,
    settings: AdsSettings,
}

impl AdsApiIntegration {
    pub fn new(
        client: Arc<dyn AdsApiClient>,
        retry: Arc<RetryManager>,
        mapping: Arc<AdMappingEngine>,
        settings: AdsSettings,
    ) -> Self {
        AdsApiIntegration {
            client,
            retry,
            mapping,
            settings,
        }
    }

    /// Validates an account's credentials, then its API access.
    ///
    /// Credential shape is checked locally first; a missing client id,
    /// secret, or refresh token fails without any network call.
    pub async fn validate_account(&self, account: &AdsAccount) -> CoreResult<()> {
        let local = account.credentials.validate();
        if !local.is_valid() {
            return Err(CoreError::validation(format!(
                "credentials for account {} are incomplete: {}",
                account.account_id,
                local.errors().join("; ")
            )));
        }
        self.retry
            .execute_with_retry("ads.validate_access", ErrorKind::Network, || {
                self.client
                    .validate_access(&account.credentials, &account.customer_id)
            })
            .await
    }

    /// Applies a list of updates to one account in fixed-size chunks.
    ///
    /// Updates run sequentially within a chunk, capturing before/after URL
    /// snapshots; a delay separates chunks. Individual failures are recorded
    /// and do not stop the batch.
    pub async fn batch_update_ads(
        &self,
        account: &AdsAccount,
        updates: &[AdUpdateRequest],
    ) -> BatchUpdateResult {
        let start = std::time::Instant::now();
        let mut batch = BatchUpdateResult::default();

        for (chunk_index, chunk) in updates.chunks(self.settings.chunk_size.max(1)).enumerate() {
            if chunk_index > 0 {
                sleep(self.settings.chunk_delay).await;
            }
            log::debug!(
                "Applying update chunk {} ({} update(s)) for account {}",
                chunk_index + 1,
                chunk.len(),
                account.account_id
            );

            for request in chunk {
                let previous_url = self
                    .client
                    .get_ad_final_url(&account.credentials, &account.customer_id, &request.ad_id)
                    .await
                    .ok()
                    .flatten();

                let outcome = self
                    .retry
                    .execute_with_retry("ads.set_final_url", ErrorKind::Network, || {
                        self.client.set_ad_final_url(
                            &account.credentials,
                            &account.customer_id,
                            request,
                        )
                    })
                    .await;

                let result = match outcome {
                    Ok(()) => {
                        batch.successful += 1;
                        crate::app::audit_log(
                            "ad.final_url.update",
                            &request.ad_id,
                            previous_url.as_deref(),
                            Some(&request.final_url),
                            true,
                        );
                        AdUpdateResult {
                            ad_id: request.ad_id.clone(),
                            success: true,
                            error: None,
                            previous_url,
                            updated_url: Some(full_url(request)),
                            timestamp_ms: Utc::now().timestamp_millis(),
                        }
                    }
                    Err(err) => {
                        batch.failed += 1;
                        log::warn!(
                            "Update of ad {} for account {} failed: {err}",
                            request.ad_id,
                            account.account_id
                        );
                        AdUpdateResult {
                            ad_id: request.ad_id.clone(),
                            success: false,
                            error: Some(err.to_string()),
                            previous_url,
                            updated_url: None,
                            timestamp_ms: Utc::now().timestamp_millis(),
                        }
                    }
                };
                batch.results.push(result);
            }
        }

        batch.elapsed_ms = start.elapsed().as_millis() as u64;
        batch
    }

    /// Runs every configured account's updates for a set of link results.
    ///
    /// Each account gets its own summary; a failing account (credentials,
    /// missing mappings) is isolated into that summary's `errors` and does
    /// not block the others. Accounts run with bounded concurrency.
    pub async fn execute_ad_updates(
        &self,
        configuration: &TrackingConfiguration,
        link_results: &[LinkResult],
    ) -> Vec<AdUpdateSummary> {
        let semaphore = Arc::new(Semaphore::new(self.settings.account_concurrency.max(1)));
        let tasks = configuration.accounts.iter().map(|account| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await;
                self.execute_for_account(account, link_results).await
            }
        });
        futures::future::join_all(tasks).await
    }

    async fn execute_for_account(
        &self,
        account: &AdsAccount,
        link_results: &[LinkResult],
    ) -> AdUpdateSummary {
        if let Err(err) = self.validate_account(account).await {
            let mut summary = AdUpdateSummary::empty(&account.account_id);
            summary.errors.push(err.to_string());
            return summary;
        }

        let (updates, errors) = self.build_updates(link_results).await;
        if updates.is_empty() {
            log::info!(
                "No applicable ad updates for account {}",
                account.account_id
            );
            let mut summary = AdUpdateSummary::empty(&account.account_id);
            summary.errors = errors;
            return summary;
        }

        log::info!(
            "Applying {} ad update(s) for account {}",
            updates.len(),
            account.account_id
        );
        let batch = self.batch_update_ads(account, &updates).await;
        AdUpdateSummary::from_batch(&account.account_id, batch, errors)
    }

    /// Resolves link results to concrete update requests via the configured
    /// mappings. URLs without a mapping are reported once each.
    async fn build_updates(
        &self,
        link_results: &[LinkResult],
    ) -> (Vec<AdUpdateRequest>, Vec<String>) {
        let mut updates = Vec::new();
        let mut errors = Vec::new();
        let mut unmapped: HashSet<&str> = HashSet::new();

        for result in link_results.iter().filter(|r| r.success) {
            let Some(base) = result.final_url_base.as_deref() else {
                continue;
            };
            let Some(config) = self.mapping.get_mapping(&result.original_url).await else {
                if unmapped.insert(result.original_url.as_str()) {
                    errors.push(format!("no ad mapping found for {}", result.original_url));
                }
                continue;
            };
            let Some(rule) = config
                .rules
                .iter()
                .find(|rule| rule.execution_number == result.execution_number)
            else {
                continue;
            };
            for ad_id in &rule.ad_ids {
                updates.push(AdUpdateRequest {
                    ad_id: ad_id.clone(),
                    campaign_id: config.campaign_id.clone(),
                    ad_group_id: config.ad_group_id.clone(),
                    final_url: base.to_string(),
                    final_url_suffix: result.final_url_suffix.clone(),
                });
            }
        }
        (updates, errors)
    }
}

fn full_url(request: &AdUpdateRequest) -> String {
    match &request.final_url_suffix {
        Some(suffix) => format!("{}?{}", request.final_url, suffix),
        None => request.final_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_composition() {
        let request = AdUpdateRequest {
            ad_id: "ad1".to_string(),
            campaign_id: "c".to_string(),
            ad_group_id: "g".to_string(),
            final_url: "https://x.com/a".to_string(),
            final_url_suffix: Some("x=1".to_string()),
        };
        assert_eq!(full_url(&request), "https://x.com/a?x=1");

        let bare = AdUpdateRequest {
            final_url_suffix: None,
            ..request
        };
        assert_eq!(full_url(&bare), "https://x.com/a");
    }
}
