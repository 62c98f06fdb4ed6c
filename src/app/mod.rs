//! Application-level utilities: URL validation, progress logging, and
//! end-of-run statistics.

pub mod logging;
pub mod statistics;
pub mod url;

pub use logging::{audit_log, log_progress, perf_log};
pub use statistics::{print_error_statistics, print_operation_statistics, print_simple_summary};
pub use url::validate_and_normalize_url;
