//! Final-destination detection heuristics.
//!
//! Deciding that a URL in a redirect chain is the genuine destination is
//! best-effort: affiliate networks interpose redirectors that look like real
//! pages, and destinations vary by campaign. The rules here are
//! configuration, not constants: callers inject the domain allow/deny lists
//! and tracking-parameter patterns that fit their campaigns.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tldextract::{TldExtractor, TldOption};
use url::Url;

use crate::config::MIN_COMPLEX_QUERY_PARAMS;
use crate::error_handling::{CoreError, CoreResult};

/// Injectable heuristic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Registered domains recognized as genuine destinations.
    pub destination_domains: Vec<String>,
    /// Registered domains known to be intermediaries/redirectors; a URL on
    /// one of these is never final.
    pub intermediary_domains: Vec<String>,
    /// Regex patterns (anchored by the matcher) naming tracking-style query
    /// parameters.
    pub tracking_param_patterns: Vec<String>,
    /// Minimum number of query parameters for a URL to count as
    /// "sufficiently complex" absent a recognized destination domain.
    pub min_complex_query_params: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            destination_domains: [
                "amazon.com",
                "ebay.com",
                "walmart.com",
                "target.com",
                "bestbuy.com",
                "aliexpress.com",
                "etsy.com",
                "shopify.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            intermediary_domains: [
                "bit.ly",
                "t.co",
                "tinyurl.com",
                "linktr.ee",
                "shareasale.com",
                "awin1.com",
                "linksynergy.com",
                "clickbank.net",
                "go2cloud.org",
                "doubleclick.net",
                "googleadservices.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            tracking_param_patterns: [
                r"^utm_\w+$",
                r"^(gclid|fbclid|msclkid|ttclid|irclickid)$",
                r"^(click_?id|sub_?id\d*|aff_?id|affiliate)$",
                r"^(tag|ref|campaign_?id)$",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_complex_query_params: MIN_COMPLEX_QUERY_PARAMS,
        }
    }
}

/// Compiled heuristics used by the extraction engine.
pub struct FinalUrlHeuristics {
    destination_domains: HashSet<String>,
    intermediary_domains: HashSet<String>,
    tracking_params: Vec<Regex>,
    min_complex_query_params: usize,
    extractor: TldExtractor,
}

impl FinalUrlHeuristics {
    /// Compiles a configuration. Invalid regex patterns are a validation
    /// failure naming the offending pattern.
    pub fn from_config(config: &HeuristicConfig) -> CoreResult<Self> {
        let mut tracking_params = Vec::with_capacity(config.tracking_param_patterns.len());
        for pattern in &config.tracking_param_patterns {
            let regex = Regex::new(pattern).map_err(|e| {
                CoreError::validation(format!("invalid tracking parameter pattern {pattern:?}: {e}"))
            })?;
            tracking_params.push(regex);
        }

        Ok(FinalUrlHeuristics {
            destination_domains: config
                .destination_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            intermediary_domains: config
                .intermediary_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            tracking_params,
            min_complex_query_params: config.min_complex_query_params,
            extractor: TldExtractor::new(TldOption::default()),
        })
    }

    /// The registered domain (`example.com` for `shop.example.com`) of a URL.
    pub fn registered_domain(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        match self.extractor.extract(host) {
            Ok(parts) => match (parts.domain, parts.suffix) {
                (Some(domain), Some(suffix)) => Some(format!("{domain}.{suffix}").to_lowercase()),
                _ => Some(host.to_lowercase()),
            },
            Err(_) => Some(host.to_lowercase()),
        }
    }

    /// Whether a query parameter name looks like a tracking parameter.
    pub fn is_tracking_param(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.tracking_params.iter().any(|p| p.is_match(&lowered))
    }

    fn has_tracking_params(&self, url: &Url) -> bool {
        url.query_pairs().any(|(name, _)| self.is_tracking_param(&name))
    }

    fn is_destination_domain(&self, url: &Url) -> bool {
        self.registered_domain(url)
            .map(|d| self.destination_domains.contains(&d))
            .unwrap_or(false)
    }

    fn is_intermediary_domain(&self, url: &Url) -> bool {
        self.registered_domain(url)
            .map(|d| self.intermediary_domains.contains(&d))
            .unwrap_or(false)
    }

    fn is_complex_query(&self, url: &Url) -> bool {
        url.query_pairs().count() >= self.min_complex_query_params
    }

    /// Whether a URL is a genuine final destination.
    ///
    /// Requires tracking-style query parameters AND (a recognized destination
    /// domain OR a sufficiently complex query) AND not an intermediary
    /// domain.
    pub fn is_final_destination(&self, url: &Url) -> bool {
        self.has_tracking_params(url)
            && (self.is_destination_domain(url) || self.is_complex_query(url))
            && !self.is_intermediary_domain(url)
    }

    /// Whether `candidate` is a better final-URL guess than `current_best`.
    ///
    /// Prefers more query parameters, tie-broken by preference for
    /// recognized destination domains.
    pub fn is_better_candidate(&self, candidate: &Url, current_best: Option<&Url>) -> bool {
        let Some(best) = current_best else {
            return true;
        };
        let candidate_params = candidate.query_pairs().count();
        let best_params = best.query_pairs().count();
        if candidate_params != best_params {
            return candidate_params > best_params;
        }
        self.is_destination_domain(candidate) && !self.is_destination_domain(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristics() -> FinalUrlHeuristics {
        FinalUrlHeuristics::from_config(&HeuristicConfig::default()).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_tracking_params() {
        let h = heuristics();
        assert!(h.is_tracking_param("utm_source"));
        assert!(h.is_tracking_param("gclid"));
        assert!(h.is_tracking_param("sub_id2"));
        assert!(h.is_tracking_param("TAG"));
        assert!(!h.is_tracking_param("color"));
        assert!(!h.is_tracking_param("page"));
    }

    #[test]
    fn test_destination_with_tracking_params_is_final() {
        let h = heuristics();
        assert!(h.is_final_destination(&url("https://www.amazon.com/dp/B01?tag=aff-20")));
    }

    #[test]
    fn test_unknown_domain_needs_complex_query() {
        let h = heuristics();
        // Tracking param but only 1 parameter on an unrecognized domain.
        assert!(!h.is_final_destination(&url("https://smallshop.io/p?utm_source=x")));
        // Three parameters including a tracking one.
        assert!(h.is_final_destination(&url(
            "https://smallshop.io/p?utm_source=x&variant=red&size=m"
        )));
    }

    #[test]
    fn test_intermediary_domain_is_never_final() {
        let h = heuristics();
        assert!(!h.is_final_destination(&url(
            "https://shareasale.com/r.cfm?gclid=x&b=1&u=2&m=3"
        )));
    }

    #[test]
    fn test_missing_tracking_params_is_not_final() {
        let h = heuristics();
        assert!(!h.is_final_destination(&url("https://www.amazon.com/dp/B01?th=1")));
    }

    #[test]
    fn test_registered_domain_strips_subdomains() {
        let h = heuristics();
        assert_eq!(
            h.registered_domain(&url("https://shop.example.com/x")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_better_candidate_prefers_more_params() {
        let h = heuristics();
        let a = url("https://x.io/p?a=1&b=2");
        let b = url("https://x.io/p?a=1");
        assert!(h.is_better_candidate(&a, Some(&b)));
        assert!(!h.is_better_candidate(&b, Some(&a)));
    }

    #[test]
    fn test_better_candidate_tie_break_on_destination_domain() {
        let h = heuristics();
        let dest = url("https://amazon.com/p?a=1&b=2");
        let other = url("https://x.io/p?a=1&b=2");
        assert!(h.is_better_candidate(&dest, Some(&other)));
        assert!(!h.is_better_candidate(&other, Some(&dest)));
    }

    #[test]
    fn test_invalid_pattern_is_validation_error() {
        let config = HeuristicConfig {
            tracking_param_patterns: vec!["(".to_string()],
            ..HeuristicConfig::default()
        };
        assert!(FinalUrlHeuristics::from_config(&config).is_err());
    }
}
