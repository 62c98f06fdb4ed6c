// Ad-mapping validation and result-mapping properties.

mod helpers;

use changelink::mapping::{
    AdMappingConfig, AdMappingEngine, AdMappingRule, MappingStrategy,
};
use changelink::TrackingConfiguration;

use helpers::tracking_configuration;

fn one_to_one_config(ad_count: usize, execution_count: u32) -> AdMappingConfig {
    let ad_ids: Vec<String> = (1..=ad_count).map(|i| format!("ad{i}")).collect();
    let rules = AdMappingEngine::create_mapping_rules(
        &ad_ids,
        execution_count,
        MappingStrategy::OneToOne,
    )
    .unwrap();
    AdMappingConfig {
        original_url: "https://aff.example.com/deal".to_string(),
        campaign_id: "camp1".to_string(),
        ad_group_id: "group1".to_string(),
        ad_ids,
        execution_count,
        strategy: MappingStrategy::OneToOne,
        rules,
    }
}

#[test]
fn test_one_to_one_requires_matching_counts() {
    for execution_count in [2, 4] {
        let result = AdMappingEngine::validate_config(&one_to_one_config(3, execution_count));
        assert!(
            !result.is_valid(),
            "3 ads with execution count {execution_count} must be rejected"
        );
        assert!(
            result.errors().iter().any(|e| e.contains("one-to-one")),
            "error must name the violated strategy rule: {:?}",
            result.errors()
        );
    }
    assert!(AdMappingEngine::validate_config(&one_to_one_config(3, 3)).is_valid());
}

#[test]
fn test_one_to_many_requires_enough_executions() {
    let result = AdMappingEngine::validate_execution_count(3, 5, MappingStrategy::OneToMany);
    assert!(!result.is_valid(), "5 ads over 3 executions must be rejected");
}

#[test]
fn test_execution_numbers_must_fit_repeat_count() {
    let mut configuration: TrackingConfiguration =
        tracking_configuration("https://aff.example.com");
    // repeat_count is 2; reference execution 3.
    configuration
        .ad_mappings
        .values_mut()
        .next()
        .unwrap()
        .push(changelink::AdMappingEntry {
            ad_id: "ad3".to_string(),
            execution_number: 3,
            campaign_id: "camp1".to_string(),
            ad_group_id: "group1".to_string(),
        });
    let result = configuration.validate();
    assert!(!result.is_valid());
}

#[tokio::test]
async fn test_map_execution_results_one_to_one_splits_urls() {
    let engine = AdMappingEngine::new();
    let config = AdMappingConfig {
        original_url: "https://aff.example.com/deal".to_string(),
        campaign_id: "camp1".to_string(),
        ad_group_id: "group1".to_string(),
        ad_ids: vec!["ad1".to_string(), "ad2".to_string()],
        execution_count: 2,
        strategy: MappingStrategy::OneToOne,
        rules: vec![
            AdMappingRule {
                execution_number: 1,
                ad_ids: vec!["ad1".to_string()],
            },
            AdMappingRule {
                execution_number: 2,
                ad_ids: vec!["ad2".to_string()],
            },
        ],
    };
    assert!(engine.configure_ad_mapping(config).await.is_valid());

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
    assert_eq!(result.mapped_ads[0].ad_id, "ad1");
    assert_eq!(result.mapped_ads[0].final_url, "https://x.com/a");
    assert_eq!(result.mapped_ads[0].final_url_suffix.as_deref(), Some("x=1"));
}

#[tokio::test]
async fn test_reconfiguring_same_url_overwrites() {
    let engine = AdMappingEngine::new();
    let first = one_to_one_config(2, 2);
    let mut second = one_to_one_config(3, 3);
    second.original_url = first.original_url.clone();

    assert!(engine.configure_ad_mapping(first).await.is_valid());
    assert!(engine.configure_ad_mapping(second).await.is_valid());

    let mappings = engine.list_mappings().await;
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].ad_ids.len(), 3, "second configuration wins");
}
