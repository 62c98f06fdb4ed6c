//! Advertising API client abstraction.
//!
//! The ads-management service is a capability this crate depends on, not one
//! it reimplements: the trait below is what the integration layer needs, and
//! the HTTP implementation is a thin adapter over a REST gateway. Tests
//! substitute their own implementations.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error_handling::{categorize_reqwest_error, CoreResult, ErrorKind};

use super::types::{AdUpdateRequest, AdsCredentials};

/// Capability interface to the advertising API.
#[async_trait]
pub trait AdsApiClient: Send + Sync {
    /// Verifies that the credentials grant access to a customer.
    async fn validate_access(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
    ) -> CoreResult<()>;

    /// Reads an ad's current final URL, for the before-snapshot.
    async fn get_ad_final_url(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
        ad_id: &str,
    ) -> CoreResult<Option<String>>;

    /// Sets an ad's final URL and suffix.
    async fn set_ad_final_url(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
        request: &AdUpdateRequest,
    ) -> CoreResult<()>;
}

/// HTTP adapter over an ads REST gateway.
pub struct HttpAdsApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct FinalUrlPayload {
    final_url: Option<String>,
}

impl HttpAdsApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpAdsApiClient {
            http,
            base_url: base_url.into(),
        }
    }

    fn auth_headers(request: reqwest::RequestBuilder, creds: &AdsCredentials) -> reqwest::RequestBuilder {
        let request = request
            .header("x-client-id", &creds.client_id)
            .bearer_auth(&creds.refresh_token);
        match &creds.developer_token {
            Some(token) => request.header("x-developer-token", token),
            None => request,
        }
    }
}

#[async_trait]
impl AdsApiClient for HttpAdsApiClient {
    async fn validate_access(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
    ) -> CoreResult<()> {
        let url = format!("{}/customers/{customer_id}:validate", self.base_url);
        Self::auth_headers(self.http.get(&url), credentials)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| categorize_reqwest_error(&e, ErrorKind::Network))?;
        Ok(())
    }

    async fn get_ad_final_url(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
        ad_id: &str,
    ) -> CoreResult<Option<String>> {
        let url = format!("{}/customers/{customer_id}/ads/{ad_id}/finalUrl", self.base_url);
        let response = Self::auth_headers(self.http.get(&url), credentials)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| categorize_reqwest_error(&e, ErrorKind::Network))?;
        let payload: FinalUrlPayload = response
            .json()
            .await
            .map_err(|e| categorize_reqwest_error(&e, ErrorKind::Network))?;
        Ok(payload.final_url)
    }

    async fn set_ad_final_url(
        &self,
        credentials: &AdsCredentials,
        customer_id: &str,
        request: &AdUpdateRequest,
    ) -> CoreResult<()> {
        let url = format!(
            "{}/customers/{customer_id}/ads/{}/finalUrl",
            self.base_url, request.ad_id
        );
        let body = serde_json::json!({
            "final_url": request.final_url,
            "final_url_suffix": request.final_url_suffix,
            "campaign_id": request.campaign_id,
            "ad_group_id": request.ad_group_id,
        });
        Self::auth_headers(self.http.post(&url), credentials)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| categorize_reqwest_error(&e, ErrorKind::Network))?;
        Ok(())
    }
}
