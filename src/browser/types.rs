//! Wire types for the browser automation API.
//!
//! The remote profile-management tool wraps every response in a
//! `{code, msg, data}` envelope; `code == 0` signals success and any other
//! value is an application-level error carrying `msg`.

use serde::{Deserialize, Serialize};

/// Response envelope used by every automation API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Lifecycle status of a browser environment (isolated profile).
///
/// Statuses the API may add later deserialize as `Unknown` instead of
/// failing the whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String")]
pub enum EnvironmentStatus {
    Active,
    Inactive,
    Expired,
    Unknown,
}

impl From<String> for EnvironmentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Active" => EnvironmentStatus::Active,
            "Inactive" => EnvironmentStatus::Inactive,
            "Expired" => EnvironmentStatus::Expired,
            _ => EnvironmentStatus::Unknown,
        }
    }
}

impl std::fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnvironmentStatus::Active => "Active",
            EnvironmentStatus::Inactive => "Inactive",
            EnvironmentStatus::Expired => "Expired",
            EnvironmentStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One isolated browser environment (persistent profile: cookies,
/// fingerprint, proxy) managed by the automation tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Environment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: EnvironmentStatus,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub proxy_type: Option<String>,
    #[serde(default)]
    pub kernel_version: Option<String>,
}

/// Fields accepted when creating or updating an environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
}

/// A running browser session bound to an environment.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSession {
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub ws_endpoint: Option<String>,
    #[serde(default)]
    pub debug_port: Option<String>,
    #[serde(default)]
    pub webdriver: Option<String>,
}

/// Whether a browser session is currently running for an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SessionStatus {
    Active,
    Inactive,
}

/// Wire shape of the browser-status endpoint payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatusPayload {
    pub status: SessionStatus,
}

/// Result of checking an environment's proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyStatus {
    #[serde(default)]
    pub usable: bool,
    #[serde(default)]
    pub outbound_ip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// An environment group.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub remark: Option<String>,
}

/// One installable browser kernel version.
#[derive(Debug, Clone, Deserialize)]
pub struct KernelVersion {
    pub version: String,
    #[serde(default)]
    pub kernel_type: Option<String>,
}

/// Paged list payload used by the list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

/// Outcome partitions of a batch start/stop over several environments.
#[derive(Debug, Default)]
pub struct BatchPartition {
    /// Environment ids whose operation succeeded.
    pub successful: Vec<String>,
    /// Environment ids whose operation failed, with the failure message.
    pub failed: Vec<(String, String)>,
}

impl BatchPartition {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_deserializes_success() {
        let raw = r#"{"code": 0, "msg": "success", "data": {"id": "env1", "status": "Active"}}"#;
        let envelope: ApiEnvelope<Environment> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.code, 0);
        let env = envelope.data.unwrap();
        assert_eq!(env.id, "env1");
        assert_eq!(env.status, EnvironmentStatus::Active);
    }

    #[test]
    fn test_envelope_error_without_data() {
        let raw = r#"{"code": -1, "msg": "environment not found"}"#;
        let envelope: ApiEnvelope<Environment> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.code, -1);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_unknown_status_does_not_fail_deserialization() {
        let raw = r#"{"id": "env1", "status": "Suspended"}"#;
        let env: Environment = serde_json::from_str(raw).unwrap();
        assert_eq!(env.status, EnvironmentStatus::Unknown);
    }

    #[test]
    fn test_paged_list_defaults() {
        let raw = r#"{}"#;
        let page: PagedList<Environment> = serde_json::from_str(raw).unwrap();
        assert!(page.list.is_empty());
        assert_eq!(page.total, 0);
    }
}
