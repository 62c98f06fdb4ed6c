//! Configuration constants.
//!
//! This module defines the tunable defaults used throughout the orchestration
//! core: timeouts, retry strategy, delays, cache TTLs, and batch sizes.

use std::time::Duration;

/// Default base URL of the local browser automation API.
pub const DEFAULT_AUTOMATION_API_URL: &str = "http://127.0.0.1:50325";

/// Default base URL of the ads REST gateway.
pub const DEFAULT_ADS_API_URL: &str = "http://127.0.0.1:8900";

/// Default SQLite database path for configurations and run history.
pub const DB_PATH: &str = "./changelink.db";

/// Per-HTTP-call timeout for the automation and ads APIs.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser session start timeout. Longer than the plain HTTP timeout because
/// a cold environment can take a while to boot its profile.
pub const BROWSER_START_TIMEOUT: Duration = Duration::from_secs(60);

/// Wait after stopping a browser session before re-checking its status.
pub const BROWSER_STOP_SETTLE: Duration = Duration::from_secs(2);

/// Wait inside the start-recovery procedure between stop and restart.
pub const BROWSER_RECOVERY_WAIT: Duration = Duration::from_secs(3);

// Retry strategy
/// Initial delay in milliseconds before the first retry.
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which the retry delay is multiplied on each attempt.
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds.
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of attempts (initial attempt + retries).
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// Circuit breaker
/// Consecutive failures before an operation's circuit opens.
pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
/// Cooldown before an open circuit allows a half-open probe.
pub const CIRCUIT_COOLDOWN: Duration = Duration::from_secs(60);

// Response cache TTLs
/// Default TTL for cached GET responses.
pub const CACHE_TTL_DEFAULT: Duration = Duration::from_secs(30);
/// TTL for list endpoints, which change more often.
pub const CACHE_TTL_LIST: Duration = Duration::from_secs(15);
/// TTL for rarely-changing metadata such as the browser-kernel list.
pub const CACHE_TTL_METADATA: Duration = Duration::from_secs(300);
/// Interval between periodic sweeps of expired cache entries.
pub const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

// URL extraction
/// Base component of the delay between repeated executions of one link.
pub const EXECUTION_DELAY_BASE_MS: u64 = 2_000;
/// Upper bound of the random jitter added to the inter-execution delay.
/// Jitter avoids both automated-looking bursts and exact periodicity.
pub const EXECUTION_DELAY_JITTER_MS: u64 = 1_500;
/// Maximum number of redirect hops to follow per navigation.
pub const MAX_REDIRECT_HOPS: usize = 10;
/// Default per-URL extraction attempts within one execution.
pub const EXTRACTION_MAX_RETRIES: u32 = 2;
/// Default number of URLs extracted concurrently in batch mode.
pub const EXTRACTION_BATCH_CONCURRENCY: usize = 3;
/// Delay between concurrency groups in batch extraction.
pub const EXTRACTION_GROUP_DELAY: Duration = Duration::from_millis(1_000);
/// Minimum query-parameter count for a URL to count as "complex".
pub const MIN_COMPLEX_QUERY_PARAMS: usize = 3;

// Environment batch operations
/// Concurrency for batch start/stop of browser environments.
pub const ENVIRONMENT_BATCH_CONCURRENCY: usize = 3;

// Ads updates
/// Number of ad updates applied per chunk.
pub const AD_UPDATE_CHUNK_SIZE: usize = 10;
/// Delay inserted between update chunks.
pub const AD_UPDATE_CHUNK_DELAY: Duration = Duration::from_millis(500);

// Progress logging
/// Seconds between periodic progress log lines.
pub const LOGGING_INTERVAL_SECS: u64 = 5;

/// Maximum accepted URL length. Longer inputs are rejected during link
/// validation to keep pathological inputs out of the pipeline.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum stored error message length. Longer messages are truncated before
/// persistence to keep the run history compact.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;
