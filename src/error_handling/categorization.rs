//! Error categorization.
//!
//! Maps transport-level failures from `reqwest` into the core taxonomy so the
//! retry layer can decide whether another attempt is worthwhile.

use super::types::{CoreError, ErrorKind};

/// Categorizes a `reqwest::Error` into a [`CoreError`].
///
/// HTTP status codes take priority: 401/403 are auth failures, 429 is rate
/// limiting, other 4xx are client errors, and 5xx are server errors. When no
/// status is available the transport failure mode decides: timeouts and
/// request errors become `default_kind` (callers pass the class appropriate
/// for the endpoint), connect failures become connection errors.
///
/// # Arguments
///
/// * `error` - The `reqwest::Error` to categorize
/// * `default_kind` - Fallback category when the error carries no HTTP status
///   (typically `Network`, `Browser`, or `Connection` depending on endpoint)
pub fn categorize_reqwest_error(error: &reqwest::Error, default_kind: ErrorKind) -> CoreError {
    if let Some(status) = error.status() {
        let code = status.as_u16();
        return match code {
            401 | 403 => CoreError::Auth(format!("HTTP {code}: {error}")),
            429 => CoreError::RateLimit(format!("HTTP 429: {error}")),
            _ if status.is_client_error() => CoreError::Client(format!("HTTP {code}: {error}")),
            _ if status.is_server_error() => CoreError::Server(format!("HTTP {code}: {error}")),
            _ => CoreError::new(default_kind, format!("HTTP {code}: {error}")),
        };
    }

    if error.is_connect() {
        return CoreError::Connection(format!("connect failed: {error}"));
    }
    if error.is_timeout() {
        return CoreError::new(default_kind, format!("timed out: {error}"));
    }
    if error.is_request() || error.is_body() || error.is_decode() {
        return CoreError::new(default_kind, error.to_string());
    }

    CoreError::new(default_kind, error.to_string())
}

/// Categorizes an application-level `{code, msg, data}` envelope failure.
///
/// The browser automation API reports errors in-band: `code != 0` with a
/// message. Messages mentioning the browser or session map to the browser
/// class; everything else keeps the endpoint's default class.
pub fn categorize_api_code(code: i64, msg: &str, default_kind: ErrorKind) -> CoreError {
    let lowered = msg.to_lowercase();
    if lowered.contains("browser") || lowered.contains("session") || lowered.contains("profile") {
        return CoreError::Browser(format!("API code {code}: {msg}"));
    }
    if lowered.contains("too many") || lowered.contains("frequent") {
        return CoreError::RateLimit(format!("API code {code}: {msg}"));
    }
    CoreError::new(default_kind, format!("API code {code}: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Building a reqwest::Error with a real status requires an HTTP exchange;
    // status-code mapping is exercised in tests/ with a wiremock server. The
    // in-band API code mapping is pure and tested here.

    #[test]
    fn test_api_code_browser_message() {
        let err = categorize_api_code(-1, "browser not open", ErrorKind::Network);
        assert_eq!(err.kind(), ErrorKind::Browser);
    }

    #[test]
    fn test_api_code_session_message() {
        let err = categorize_api_code(500, "session already exists", ErrorKind::Connection);
        assert_eq!(err.kind(), ErrorKind::Browser);
    }

    #[test]
    fn test_api_code_rate_limited_message() {
        let err = categorize_api_code(429, "request too frequent", ErrorKind::Network);
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn test_api_code_default_kind() {
        let err = categorize_api_code(-1, "unknown failure", ErrorKind::Connection);
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.message().contains("API code -1"));
    }
}
