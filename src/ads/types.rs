//! Advertising account and update types.

use serde::{Deserialize, Serialize};

use crate::mapping::ValidationResult;

/// OAuth-style credentials for one advertising account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub developer_token: Option<String>,
}

impl AdsCredentials {
    /// Local credential check: non-empty client id/secret and refresh token.
    /// Runs before any network call; absent fields fail validation here.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if self.client_id.trim().is_empty() {
            errors.push("client id is required".to_string());
        }
        if self.client_secret.trim().is_empty() {
            errors.push("client secret is required".to_string());
        }
        if self.refresh_token.trim().is_empty() {
            errors.push("refresh token is required".to_string());
        }
        ValidationResult::from_errors(errors)
    }
}

/// One target advertising account of a tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsAccount {
    /// Internal identifier used in summaries and logs.
    pub account_id: String,
    /// Customer id at the advertising API.
    pub customer_id: String,
    pub credentials: AdsCredentials,
}

/// One imperative "set this ad's final URL" instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdUpdateRequest {
    pub ad_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    /// Final URL without its query string.
    pub final_url: String,
    /// Query suffix without the leading `?`.
    pub final_url_suffix: Option<String>,
}

/// Outcome of one ad update, with before/after URL snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdUpdateResult {
    pub ad_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub previous_url: Option<String>,
    pub updated_url: Option<String>,
    /// Epoch millis when the update finished.
    pub timestamp_ms: i64,
}

/// Outcome of one chunked batch of updates.
#[derive(Debug, Clone, Default)]
pub struct BatchUpdateResult {
    pub results: Vec<AdUpdateResult>,
    pub successful: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// Per-account outcome of an execution's ad updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdUpdateSummary {
    pub account_id: String,
    pub total_updates: usize,
    pub successful_updates: usize,
    pub failed_updates: usize,
    /// successful / total; 0 when the account had no updates.
    pub success_rate: f64,
    /// Account-level failures (credential validation, missing mappings).
    pub errors: Vec<String>,
    pub results: Vec<AdUpdateResult>,
}

impl AdUpdateSummary {
    /// An empty summary for an account that produced no updates.
    pub fn empty(account_id: &str) -> Self {
        AdUpdateSummary {
            account_id: account_id.to_string(),
            total_updates: 0,
            successful_updates: 0,
            failed_updates: 0,
            success_rate: 0.0,
            errors: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Builds a summary from a batch outcome.
    pub fn from_batch(account_id: &str, batch: BatchUpdateResult, errors: Vec<String>) -> Self {
        let total = batch.results.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            batch.successful as f64 / total as f64
        };
        AdUpdateSummary {
            account_id: account_id.to_string(),
            total_updates: total,
            successful_updates: batch.successful,
            failed_updates: batch.failed,
            success_rate,
            errors,
            results: batch.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AdsCredentials {
        AdsCredentials {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            developer_token: None,
        }
    }

    #[test]
    fn test_credentials_validate_ok() {
        assert!(credentials().validate().is_valid());
    }

    #[test]
    fn test_credentials_missing_fields() {
        let mut creds = credentials();
        creds.client_secret = String::new();
        creds.refresh_token = "  ".to_string();
        let result = creds.validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 2);
    }

    #[test]
    fn test_summary_success_rate_zero_when_empty() {
        let summary = AdUpdateSummary::from_batch("acct", BatchUpdateResult::default(), vec![]);
        assert_eq!(summary.success_rate, 0.0);
        assert!(!summary.success_rate.is_nan());
    }

    #[test]
    fn test_summary_success_rate() {
        let batch = BatchUpdateResult {
            results: vec![
                AdUpdateResult {
                    ad_id: "a".to_string(),
                    success: true,
                    error: None,
                    previous_url: None,
                    updated_url: Some("https://x".to_string()),
                    timestamp_ms: 0,
                },
                AdUpdateResult {
                    ad_id: "b".to_string(),
                    success: false,
                    error: Some("boom".to_string()),
                    previous_url: None,
                    updated_url: None,
                    timestamp_ms: 0,
                },
            ],
            successful: 1,
            failed: 1,
            elapsed_ms: 5,
        };
        let summary = AdUpdateSummary::from_batch("acct", batch, vec![]);
        assert!((summary.success_rate - 0.5).abs() < f64::EPSILON);
    }
}
