//! URL validation and normalization utilities.

use log::warn;

use crate::config::MAX_URL_LENGTH;

/// Validates and normalizes an original link.
///
/// Adds an https:// prefix if missing, then checks that the URL is
/// syntactically valid and uses an http/https scheme. Rejects URLs longer
/// than `MAX_URL_LENGTH`.
///
/// # Returns
///
/// `Some(normalized_url)` if the URL should be processed, `None` otherwise.
pub fn validate_and_normalize_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            trimmed.len(),
            MAX_URL_LENGTH,
            &trimmed[..50.min(trimmed.len())]
        );
        return None;
    }

    let normalized = if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    if normalized.len() > MAX_URL_LENGTH {
        warn!("Skipping URL exceeding maximum length after normalization: {normalized:.50}...");
        return None;
    }

    match url::Url::parse(&normalized) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Some(normalized),
            _ => {
                warn!("Skipping unsupported scheme for URL: {url}");
                None
            }
        },
        Err(_) => {
            warn!("Skipping invalid URL: {url}");
            None
        }
    }
}
