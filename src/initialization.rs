//! Shared resource initialization: logger, HTTP clients, semaphores.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;
use tokio::sync::Semaphore;

use crate::config::{LogFormat, HTTP_TIMEOUT};

/// Initializes the global logger with the given level and format.
///
/// Safe to call more than once; subsequent calls are ignored (relevant for
/// tests, where several cases may initialize logging).
pub fn init_logger_with(level: log::LevelFilter, format: LogFormat) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if matches!(format, LogFormat::Json) {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{}",
                serde_json::json!({
                    "ts": chrono::Utc::now().to_rfc3339(),
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "msg": record.args().to_string(),
                })
            )
        });
    }

    // try_init instead of init: the logger may already be set.
    let _ = builder.try_init();
    Ok(())
}

/// Builds the HTTP client used for API calls (redirects followed).
pub fn init_client(timeout: Option<Duration>) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(timeout.unwrap_or(HTTP_TIMEOUT))
        .build()?;
    Ok(Arc::new(client))
}

/// Builds the navigation client with redirects disabled, so redirect chains
/// can be tracked hop by hop.
pub fn init_redirect_client(
    timeout: Option<Duration>,
) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(timeout.unwrap_or(HTTP_TIMEOUT))
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Creates a semaphore bounding concurrent operations.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
