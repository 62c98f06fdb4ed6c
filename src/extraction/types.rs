//! Extraction request/result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{EXTRACTION_BATCH_CONCURRENCY, EXTRACTION_MAX_RETRIES};

/// Request to resolve one original (affiliate) URL.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Browser environment the navigation runs in.
    pub environment_id: String,
    /// The affiliate/tracking link to resolve.
    pub original_url: String,
    /// How many independent executions to perform.
    pub repeat_count: u32,
    /// Attempts per execution before that execution fails.
    pub max_retries: u32,
}

impl ExtractionRequest {
    pub fn new(environment_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            original_url: original_url.into(),
            repeat_count: 1,
            max_retries: EXTRACTION_MAX_RETRIES,
        }
    }
}

/// Request to resolve several URLs concurrently.
#[derive(Debug, Clone)]
pub struct BatchExtractionRequest {
    pub environment_id: String,
    pub urls: Vec<String>,
    /// Executions per URL.
    pub repeat_count: u32,
    /// URLs resolved concurrently within one group.
    pub concurrency: usize,
}

impl BatchExtractionRequest {
    pub fn new(environment_id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            urls,
            repeat_count: 1,
            concurrency: EXTRACTION_BATCH_CONCURRENCY,
        }
    }
}

/// Outcome of one execution of one original URL. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResult {
    pub original_url: String,
    /// 1-indexed execution this result belongs to.
    pub execution_number: u32,
    /// The full resolved URL, when any candidate was found.
    pub final_url: Option<String>,
    /// Scheme + host + path of the final URL.
    pub final_url_base: Option<String>,
    /// Query string of the final URL, without its leading `?`.
    pub final_url_suffix: Option<String>,
    /// Parsed query parameters of the final URL.
    pub parameters: BTreeMap<String, String>,
    /// Every URL visited while following redirects, in order.
    pub redirect_chain: Vec<String>,
    pub success: bool,
    /// Whether the final URL passed the destination heuristic, as opposed to
    /// being the best-so-far candidate returned as a fallback.
    pub validated: bool,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub attempt_count: u32,
}

impl LinkResult {
    /// A failed execution with no candidate URL.
    pub fn failed(
        original_url: &str,
        execution_number: u32,
        error: impl Into<String>,
        attempt_count: u32,
        execution_time_ms: u64,
    ) -> Self {
        LinkResult {
            original_url: original_url.to_string(),
            execution_number,
            final_url: None,
            final_url_base: None,
            final_url_suffix: None,
            parameters: BTreeMap::new(),
            redirect_chain: Vec::new(),
            success: false,
            validated: false,
            error: Some(error.into()),
            execution_time_ms,
            attempt_count,
        }
    }

    /// A resolved execution, splitting the candidate into base and suffix.
    pub fn resolved(
        original_url: &str,
        execution_number: u32,
        candidate: &Url,
        redirect_chain: Vec<String>,
        validated: bool,
        attempt_count: u32,
        execution_time_ms: u64,
    ) -> Self {
        let (base, suffix) = split_url(candidate);
        LinkResult {
            original_url: original_url.to_string(),
            execution_number,
            final_url: Some(candidate.to_string()),
            final_url_base: Some(base),
            final_url_suffix: suffix,
            parameters: query_map(candidate),
            redirect_chain,
            success: true,
            validated,
            error: None,
            execution_time_ms,
            attempt_count,
        }
    }
}

/// Splits a URL into its base (scheme + host + path) and query suffix
/// (without the leading `?`).
pub fn split_url(url: &Url) -> (String, Option<String>) {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    (base.to_string(), url.query().map(str::to_string))
}

/// The query parameters of a URL as an ordered map. Repeated names keep the
/// last value.
pub fn query_map(url: &Url) -> BTreeMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Aggregate counters for one batch extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_urls: usize,
    pub successful_urls: usize,
    pub failed_urls: usize,
    pub total_executions: usize,
    pub validated_executions: usize,
    pub elapsed_ms: u64,
}

/// Results plus summary for one batch extraction.
#[derive(Debug, Clone)]
pub struct BatchExtractionOutcome {
    pub results: Vec<LinkResult>,
    pub summary: ExtractionSummary,
}
