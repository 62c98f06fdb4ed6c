//! Core domain models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ads::AdsAccount;
use crate::mapping::ValidationResult;

/// One entry of a configuration's ad-mapping table: which ad receives the
/// final URL produced by a given execution of an original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdMappingEntry {
    pub ad_id: String,
    /// 1-indexed execution whose final URL this ad receives.
    pub execution_number: u32,
    pub campaign_id: String,
    pub ad_group_id: String,
}

/// A named automation job: which environment to use, which links to resolve,
/// how often, and which ads receive the results.
///
/// Created and edited elsewhere; the orchestrator consumes it read-only
/// during a run and writes back `last_executed`/`status` afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfiguration {
    pub id: String,
    pub name: String,
    /// Browser environment the resolutions run in.
    pub environment_id: String,
    /// The affiliate links to resolve.
    pub original_urls: Vec<String>,
    /// Independent resolutions per link.
    pub repeat_count: u32,
    /// Target advertising accounts.
    pub accounts: Vec<AdsAccount>,
    /// Original URL → mapping entries.
    #[serde(default)]
    pub ad_mappings: HashMap<String, Vec<AdMappingEntry>>,
    /// Whether to send a notification when a run finishes.
    #[serde(default = "default_notify")]
    pub notify: bool,
    /// Epoch millis of the last run, when any.
    #[serde(default)]
    pub last_executed: Option<i64>,
    /// Status of the last run, when any.
    #[serde(default)]
    pub status: Option<String>,
}

fn default_notify() -> bool {
    true
}

impl TrackingConfiguration {
    /// Validates the structural invariants of a configuration.
    ///
    /// Checked before a run starts: a non-empty environment id, at least one
    /// original link, at least one account, a repeat count of at least 1,
    /// and a consistent mapping table. Every referenced execution number
    /// must lie between 1 and `repeat_count`; several ads may share an
    /// execution number (that execution's URL then feeds all of them), but
    /// listing the same ad twice for the same execution is a duplicate.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.environment_id.trim().is_empty() {
            errors.push("environment id is required".to_string());
        }
        if self.original_urls.is_empty() {
            errors.push("at least one original link is required".to_string());
        }
        if self.accounts.is_empty() {
            errors.push("at least one advertising account is required".to_string());
        }
        if self.repeat_count == 0 {
            errors.push("repeat count must be at least 1".to_string());
        }

        for (url, entries) in &self.ad_mappings {
            let mut seen = std::collections::HashSet::new();
            for entry in entries {
                if entry.execution_number == 0 || entry.execution_number > self.repeat_count {
                    errors.push(format!(
                        "mapping for {url}: execution number {} is outside 1..={}",
                        entry.execution_number, self.repeat_count
                    ));
                }
                if !seen.insert((entry.execution_number, entry.ad_id.as_str())) {
                    errors.push(format!(
                        "mapping for {url}: ad {} listed twice for execution {}",
                        entry.ad_id, entry.execution_number
                    ));
                }
            }
        }

        ValidationResult::from_errors(errors)
    }

    /// Mapping entries for one original URL, when configured.
    pub fn mappings_for(&self, original_url: &str) -> Option<&[AdMappingEntry]> {
        self.ad_mappings.get(original_url).map(Vec::as_slice)
    }
}
