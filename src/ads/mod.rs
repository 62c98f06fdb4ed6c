//! Advertising API integration: credential validation, chunked batch
//! updates, and the bridge from link results to per-account update batches.

mod client;
mod integration;
mod types;

pub use client::{AdsApiClient, HttpAdsApiClient};
pub use integration::{AdsApiIntegration, AdsSettings};
pub use types::{
    AdUpdateRequest, AdUpdateResult, AdUpdateSummary, AdsAccount, AdsCredentials,
    BatchUpdateResult,
};
