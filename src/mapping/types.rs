//! Ad-mapping types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How executions of an original URL are bound to ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingStrategy {
    /// Execution *i* maps to ad *i*; requires as many executions as ads.
    #[serde(rename = "one-to-one")]
    OneToOne,
    /// Ads are partitioned into contiguous groups, group *i* assigned to
    /// execution *i*.
    #[serde(rename = "one-to-many")]
    OneToMany,
}

impl std::fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingStrategy::OneToOne => f.write_str("one-to-one"),
            MappingStrategy::OneToMany => f.write_str("one-to-many"),
        }
    }
}

/// Binds one execution number to the ads receiving that execution's URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdMappingRule {
    /// 1-indexed execution this rule applies to.
    pub execution_number: u32,
    pub ad_ids: Vec<String>,
}

/// A configured mapping from one original URL to a set of ads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdMappingConfig {
    pub original_url: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub ad_ids: Vec<String>,
    /// Executions configured for the original URL.
    pub execution_count: u32,
    pub strategy: MappingStrategy,
    pub rules: Vec<AdMappingRule>,
}

/// Outcome of validating a configuration: valid, or invalid with every
/// violated rule spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// The violation messages; empty when valid.
    pub fn errors(&self) -> &[String] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    /// Builds a result from collected violations.
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(errors)
        }
    }
}

/// One ad with the final URL assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedAd {
    pub ad_id: String,
    pub execution_number: u32,
    /// Final URL up to (excluding) the first `?`.
    pub final_url: String,
    /// Query string after the first `?`, when present.
    pub final_url_suffix: Option<String>,
}

/// Result of mapping one URL's execution results onto its configured ads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdMappingResult {
    pub original_url: String,
    pub mapped_ads: Vec<MappedAd>,
    /// Execution number → ad ids, for audit/debugging.
    pub distribution: BTreeMap<u32, Vec<String>>,
}

/// Aggregate statistics over the in-memory mapping table.
#[derive(Debug, Clone, Default)]
pub struct MappingStatistics {
    pub total_mappings: usize,
    pub one_to_one: usize,
    pub one_to_many: usize,
    /// Accepted configurations (equal to `total_mappings`).
    pub valid: usize,
    /// Rejected configuration attempts since engine creation.
    pub invalid: usize,
    pub average_ads_per_mapping: f64,
}

impl MappingStatistics {
    /// Share of configuration attempts that were valid (1.0 when none yet).
    pub fn valid_ratio(&self) -> f64 {
        let attempts = self.valid + self.invalid;
        if attempts == 0 {
            1.0
        } else {
            self.valid as f64 / attempts as f64
        }
    }
}
