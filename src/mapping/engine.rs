//! Ad-mapping engine.
//!
//! Associates original URLs with advertisement identifiers under one-to-one
//! or one-to-many strategies. Mappings live in an in-memory table keyed by
//! original URL; configuring the same URL twice overwrites rather than
//! duplicates.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::error_handling::{CoreError, CoreResult};

use super::types::{
    AdMappingConfig, AdMappingResult, AdMappingRule, MappedAd, MappingStatistics, MappingStrategy,
    ValidationResult,
};

/// In-memory mapping table plus rule generation and validation.
#[derive(Default)]
pub struct AdMappingEngine {
    mappings: RwLock<HashMap<String, AdMappingConfig>>,
    rejected_configs: AtomicUsize,
}

impl AdMappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the execution-count/ad-count relationship for a strategy.
    ///
    /// Both strategies require `execution_count >= ad_count`; one-to-one
    /// additionally requires them to be equal, and one-to-many requires at
    /// least two ads to be meaningful.
    pub fn validate_execution_count(
        execution_count: u32,
        ad_count: usize,
        strategy: MappingStrategy,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let ad_count = ad_count as u32;

        if execution_count < ad_count {
            errors.push(format!(
                "execution count {execution_count} is less than ad count {ad_count}"
            ));
        }
        match strategy {
            MappingStrategy::OneToOne => {
                if execution_count != ad_count {
                    errors.push(format!(
                        "one-to-one strategy requires execution count ({execution_count}) to equal ad count ({ad_count})"
                    ));
                }
            }
            MappingStrategy::OneToMany => {
                if ad_count < 2 {
                    errors.push(format!(
                        "one-to-many strategy requires at least 2 ads, got {ad_count}"
                    ));
                }
            }
        }
        ValidationResult::from_errors(errors)
    }

    /// Validates a full configuration against every rule.
    pub fn validate_config(config: &AdMappingConfig) -> ValidationResult {
        let mut errors = Self::structural_errors(config);

        let count_check = Self::validate_execution_count(
            config.execution_count,
            config.ad_ids.len(),
            config.strategy,
        );
        errors.extend(count_check.errors().iter().cloned());
        errors.extend(Self::rule_errors(config));

        ValidationResult::from_errors(errors)
    }

    /// Validates a configuration whose rules were written out explicitly
    /// rather than generated from a strategy.
    ///
    /// The strategy count relationships do not apply here: the rule set
    /// itself is the source of truth, and its strategy field is purely
    /// descriptive. Structural invariants still hold (URL and ad group
    /// present, at least one ad and one rule, unique execution numbers,
    /// numbers within the configured execution count).
    pub fn validate_explicit_config(config: &AdMappingConfig) -> ValidationResult {
        let mut errors = Self::structural_errors(config);
        if config.rules.is_empty() {
            errors.push("at least one mapping rule is required".to_string());
        }
        errors.extend(Self::rule_errors(config));
        ValidationResult::from_errors(errors)
    }

    fn structural_errors(config: &AdMappingConfig) -> Vec<String> {
        let mut errors = Vec::new();
        if config.original_url.trim().is_empty() {
            errors.push("original URL is required".to_string());
        }
        if config.ad_group_id.trim().is_empty() {
            errors.push("ad group id is required".to_string());
        }
        if config.ad_ids.is_empty() {
            errors.push("at least one ad id is required".to_string());
        }
        errors
    }

    fn rule_errors(config: &AdMappingConfig) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for rule in &config.rules {
            if !seen.insert(rule.execution_number) {
                errors.push(format!(
                    "duplicate execution number {} in mapping rules",
                    rule.execution_number
                ));
            }
            if rule.execution_number == 0 {
                errors.push("execution numbers are 1-indexed; 0 is invalid".to_string());
            }
            if rule.execution_number > config.execution_count {
                errors.push(format!(
                    "execution number {} exceeds configured execution count {}",
                    rule.execution_number, config.execution_count
                ));
            }
        }
        errors
    }

    /// Generates mapping rules for a URL's ads under a strategy.
    ///
    /// One-to-one maps execution *i* to ad *i* in list order, up to
    /// `min(execution_count, ad_count)`. One-to-many partitions the ads into
    /// `ceil(ad_count / execution_count)`-sized contiguous groups and
    /// assigns group *i* to execution *i*.
    pub fn create_mapping_rules(
        ad_ids: &[String],
        execution_count: u32,
        strategy: MappingStrategy,
    ) -> CoreResult<Vec<AdMappingRule>> {
        if ad_ids.is_empty() {
            return Err(CoreError::validation("cannot build rules without ad ids"));
        }
        if execution_count == 0 {
            return Err(CoreError::validation(
                "cannot build rules for an execution count of 0",
            ));
        }

        let rules = match strategy {
            MappingStrategy::OneToOne => {
                let bound = (execution_count as usize).min(ad_ids.len());
                ad_ids[..bound]
                    .iter()
                    .enumerate()
                    .map(|(index, ad_id)| AdMappingRule {
                        execution_number: index as u32 + 1,
                        ad_ids: vec![ad_id.clone()],
                    })
                    .collect()
            }
            MappingStrategy::OneToMany => {
                let group_size = ad_ids.len().div_ceil(execution_count as usize).max(1);
                ad_ids
                    .chunks(group_size)
                    .enumerate()
                    .map(|(index, group)| AdMappingRule {
                        execution_number: index as u32 + 1,
                        ad_ids: group.to_vec(),
                    })
                    .collect()
            }
        };
        Ok(rules)
    }

    /// Validates and stores a configuration.
    ///
    /// A valid configuration replaces any previous mapping for the same
    /// original URL (overwrite, not duplicate). Invalid configurations are
    /// rejected and counted, leaving the table untouched.
    pub async fn configure_ad_mapping(&self, config: AdMappingConfig) -> ValidationResult {
        let validation = Self::validate_config(&config);
        self.store_if_valid(config, validation).await
    }

    /// Validates and stores an explicitly-ruled configuration.
    ///
    /// Same overwrite semantics as [`AdMappingEngine::configure_ad_mapping`],
    /// validated with [`AdMappingEngine::validate_explicit_config`].
    pub async fn configure_explicit_mapping(&self, config: AdMappingConfig) -> ValidationResult {
        let validation = Self::validate_explicit_config(&config);
        self.store_if_valid(config, validation).await
    }

    async fn store_if_valid(
        &self,
        config: AdMappingConfig,
        validation: ValidationResult,
    ) -> ValidationResult {
        if !validation.is_valid() {
            self.rejected_configs.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Rejected ad mapping for {}: {}",
                config.original_url,
                validation.errors().join("; ")
            );
            return validation;
        }
        log::debug!(
            "Configured {} mapping for {} ({} ads over {} executions)",
            config.strategy,
            config.original_url,
            config.ad_ids.len(),
            config.execution_count
        );
        self.mappings
            .write()
            .await
            .insert(config.original_url.clone(), config);
        ValidationResult::Valid
    }

    /// Maps a URL's per-execution final URLs onto its configured ads.
    ///
    /// `final_urls[i]` is the result of execution `i + 1`. Each URL is split
    /// at its first `?` into base and suffix and attached to the ad(s) the
    /// rules assign to that execution.
    pub async fn map_execution_results_to_ads(
        &self,
        original_url: &str,
        final_urls: &[String],
        execution_count: u32,
    ) -> CoreResult<AdMappingResult> {
        let mappings = self.mappings.read().await;
        let config = mappings.get(original_url).ok_or_else(|| {
            CoreError::validation(format!("no ad mapping configured for {original_url}"))
        })?;

        let usable_executions = (final_urls.len() as u32).min(execution_count);
        let mut mapped_ads = Vec::new();
        let mut distribution: BTreeMap<u32, Vec<String>> = BTreeMap::new();

        for execution in 1..=usable_executions {
            let Some(rule) = config
                .rules
                .iter()
                .find(|rule| rule.execution_number == execution)
            else {
                continue;
            };
            let final_url = &final_urls[(execution - 1) as usize];
            let (base, suffix) = split_at_query(final_url);

            for ad_id in &rule.ad_ids {
                mapped_ads.push(MappedAd {
                    ad_id: ad_id.clone(),
                    execution_number: execution,
                    final_url: base.to_string(),
                    final_url_suffix: suffix.map(str::to_string),
                });
            }
            distribution.insert(execution, rule.ad_ids.clone());
        }

        Ok(AdMappingResult {
            original_url: original_url.to_string(),
            mapped_ads,
            distribution,
        })
    }

    /// The stored mapping for a URL, when one exists.
    pub async fn get_mapping(&self, original_url: &str) -> Option<AdMappingConfig> {
        self.mappings.read().await.get(original_url).cloned()
    }

    /// Every stored mapping, in no particular order.
    pub async fn list_mappings(&self) -> Vec<AdMappingConfig> {
        self.mappings.read().await.values().cloned().collect()
    }

    /// Removes a mapping; returns whether one existed.
    pub async fn remove_mapping(&self, original_url: &str) -> bool {
        self.mappings.write().await.remove(original_url).is_some()
    }

    /// Aggregate statistics over the table and validation history.
    pub async fn statistics(&self) -> MappingStatistics {
        let mappings = self.mappings.read().await;
        let total = mappings.len();
        let one_to_one = mappings
            .values()
            .filter(|c| c.strategy == MappingStrategy::OneToOne)
            .count();
        let total_ads: usize = mappings.values().map(|c| c.ad_ids.len()).sum();
        MappingStatistics {
            total_mappings: total,
            one_to_one,
            one_to_many: total - one_to_one,
            valid: total,
            invalid: self.rejected_configs.load(Ordering::Relaxed),
            average_ads_per_mapping: if total == 0 {
                0.0
            } else {
                total_ads as f64 / total as f64
            },
        }
    }
}

/// Splits a raw URL string at its first `?`. An empty query yields no suffix.
fn split_at_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((base, "")) => (base, None),
        Some((base, suffix)) => (base, Some(suffix)),
        None => (url, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ads(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("ad{i}")).collect()
    }

    fn config(
        ad_ids: Vec<String>,
        execution_count: u32,
        strategy: MappingStrategy,
    ) -> AdMappingConfig {
        let rules =
            AdMappingEngine::create_mapping_rules(&ad_ids, execution_count, strategy)
                .unwrap_or_default();
        AdMappingConfig {
            original_url: "https://aff.example.com/deal".to_string(),
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
            ad_ids,
            execution_count,
            strategy,
            rules,
        }
    }

    #[test]
    fn test_one_to_one_requires_equal_counts() {
        let result =
            AdMappingEngine::validate_execution_count(2, 3, MappingStrategy::OneToOne);
        assert!(!result.is_valid());

        let result =
            AdMappingEngine::validate_execution_count(4, 3, MappingStrategy::OneToOne);
        assert!(!result.is_valid());

        let result =
            AdMappingEngine::validate_execution_count(3, 3, MappingStrategy::OneToOne);
        assert!(result.is_valid());
    }

    #[test]
    fn test_one_to_many_requires_enough_executions() {
        let result =
            AdMappingEngine::validate_execution_count(3, 5, MappingStrategy::OneToMany);
        assert!(!result.is_valid());

        let result =
            AdMappingEngine::validate_execution_count(5, 5, MappingStrategy::OneToMany);
        assert!(result.is_valid());
    }

    #[test]
    fn test_one_to_many_requires_two_ads() {
        let result =
            AdMappingEngine::validate_execution_count(3, 1, MappingStrategy::OneToMany);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_one_to_one_rules_in_list_order() {
        let rules =
            AdMappingEngine::create_mapping_rules(&ads(3), 3, MappingStrategy::OneToOne).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].execution_number, 1);
        assert_eq!(rules[0].ad_ids, vec!["ad1".to_string()]);
        assert_eq!(rules[2].ad_ids, vec!["ad3".to_string()]);
    }

    #[test]
    fn test_one_to_one_rules_stop_at_shorter_side() {
        let rules =
            AdMappingEngine::create_mapping_rules(&ads(3), 2, MappingStrategy::OneToOne).unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_one_to_many_rules_partition_contiguously() {
        let rules =
            AdMappingEngine::create_mapping_rules(&ads(4), 2, MappingStrategy::OneToMany).unwrap();
        // ceil(4/2) = 2 ads per group.
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].ad_ids, vec!["ad1".to_string(), "ad2".to_string()]);
        assert_eq!(rules[1].ad_ids, vec!["ad3".to_string(), "ad4".to_string()]);
    }

    #[test]
    fn test_duplicate_execution_numbers_rejected() {
        let mut cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        cfg.rules[1].execution_number = 1;
        let result = AdMappingEngine::validate_config(&cfg);
        assert!(!result.is_valid());
        assert!(result.errors().iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn test_execution_number_above_count_rejected() {
        let mut cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        cfg.rules[1].execution_number = 5;
        let result = AdMappingEngine::validate_config(&cfg);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_explicit_config_accepts_sparse_single_ad() {
        // One ad deliberately mapped only to execution 1 of 3.
        let cfg = AdMappingConfig {
            original_url: "https://aff.example.com/deal".to_string(),
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
            ad_ids: vec!["ad1".to_string()],
            execution_count: 3,
            strategy: MappingStrategy::OneToOne,
            rules: vec![AdMappingRule {
                execution_number: 1,
                ad_ids: vec!["ad1".to_string()],
            }],
        };
        assert!(AdMappingEngine::validate_explicit_config(&cfg).is_valid());
        // The strategy-inferred path rejects the same shape.
        assert!(!AdMappingEngine::validate_config(&cfg).is_valid());
    }

    #[test]
    fn test_explicit_config_accepts_more_ads_than_executions() {
        let cfg = AdMappingConfig {
            original_url: "https://aff.example.com/deal".to_string(),
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
            ad_ids: vec!["ad1".to_string(), "ad2".to_string(), "ad3".to_string()],
            execution_count: 2,
            strategy: MappingStrategy::OneToMany,
            rules: vec![
                AdMappingRule {
                    execution_number: 1,
                    ad_ids: vec!["ad1".to_string(), "ad2".to_string()],
                },
                AdMappingRule {
                    execution_number: 2,
                    ad_ids: vec!["ad3".to_string()],
                },
            ],
        };
        assert!(AdMappingEngine::validate_explicit_config(&cfg).is_valid());
    }

    #[test]
    fn test_explicit_config_still_rejects_bad_rules() {
        let mut cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        cfg.rules[1].execution_number = 5;
        assert!(!AdMappingEngine::validate_explicit_config(&cfg).is_valid());

        let mut cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        cfg.rules[1].execution_number = 1;
        assert!(!AdMappingEngine::validate_explicit_config(&cfg).is_valid());

        let mut cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        cfg.rules.clear();
        assert!(!AdMappingEngine::validate_explicit_config(&cfg).is_valid());
    }

    #[tokio::test]
    async fn test_configure_explicit_mapping_stores_sparse_shape() {
        let engine = AdMappingEngine::new();
        let cfg = AdMappingConfig {
            original_url: "https://aff.example.com/deal".to_string(),
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
            ad_ids: vec!["ad1".to_string()],
            execution_count: 3,
            strategy: MappingStrategy::OneToOne,
            rules: vec![AdMappingRule {
                execution_number: 1,
                ad_ids: vec!["ad1".to_string()],
            }],
        };
        assert!(engine.configure_explicit_mapping(cfg).await.is_valid());
        assert_eq!(engine.list_mappings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_configure_is_idempotent_overwrite() {
        let engine = AdMappingEngine::new();
        let cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        assert!(engine.configure_ad_mapping(cfg.clone()).await.is_valid());
        assert!(engine.configure_ad_mapping(cfg.clone()).await.is_valid());

        let stored = engine.list_mappings().await;
        assert_eq!(stored.len(), 1, "same input twice must leave one mapping");
    }

    #[tokio::test]
    async fn test_invalid_config_not_stored() {
        let engine = AdMappingEngine::new();
        let cfg = config(ads(3), 2, MappingStrategy::OneToOne);
        assert!(!engine.configure_ad_mapping(cfg).await.is_valid());
        assert!(engine.list_mappings().await.is_empty());

        let stats = engine.statistics().await;
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.total_mappings, 0);
    }

    #[tokio::test]
    async fn test_map_execution_results_one_to_one() {
        let engine = AdMappingEngine::new();
        let cfg = AdMappingConfig {
            original_url: "https://aff.example.com/deal".to_string(),
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
            ad_ids: vec!["ad1".to_string(), "ad2".to_string()],
            execution_count: 2,
            strategy: MappingStrategy::OneToOne,
            rules: AdMappingEngine::create_mapping_rules(
                &["ad1".to_string(), "ad2".to_string()],
                2,
                MappingStrategy::OneToOne,
            )
            .unwrap(),
        };
        assert!(engine.configure_ad_mapping(cfg).await.is_valid());

        let result = engine
            .map_execution_results_to_ads(
                "https://aff.example.com/deal",
                &[
                    "https://x.com/a?x=1".to_string(),
                    "https://x.com/b?y=2".to_string(),
                ],
                2,
            )
            .await
            .unwrap();

        assert_eq!(result.mapped_ads.len(), 2);
        let ad1 = &result.mapped_ads[0];
        assert_eq!(ad1.ad_id, "ad1");
        assert_eq!(ad1.final_url, "https://x.com/a");
        assert_eq!(ad1.final_url_suffix.as_deref(), Some("x=1"));
        let ad2 = &result.mapped_ads[1];
        assert_eq!(ad2.ad_id, "ad2");
        assert_eq!(ad2.final_url, "https://x.com/b");
        assert_eq!(ad2.final_url_suffix.as_deref(), Some("y=2"));
        assert_eq!(result.distribution[&1], vec!["ad1".to_string()]);
        assert_eq!(result.distribution[&2], vec!["ad2".to_string()]);
    }

    #[tokio::test]
    async fn test_map_without_configuration_fails() {
        let engine = AdMappingEngine::new();
        let result = engine
            .map_execution_results_to_ads("https://nowhere.example.com", &[], 1)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_mapping() {
        let engine = AdMappingEngine::new();
        let cfg = config(ads(2), 2, MappingStrategy::OneToOne);
        engine.configure_ad_mapping(cfg).await;
        assert!(engine.remove_mapping("https://aff.example.com/deal").await);
        assert!(!engine.remove_mapping("https://aff.example.com/deal").await);
    }

    #[test]
    fn test_split_at_query() {
        assert_eq!(split_at_query("https://x.com/a?x=1"), ("https://x.com/a", Some("x=1")));
        assert_eq!(split_at_query("https://x.com/a"), ("https://x.com/a", None));
        assert_eq!(split_at_query("https://x.com/a?"), ("https://x.com/a", None));
    }
}
