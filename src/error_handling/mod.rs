//! Error taxonomy, categorization, and statistics.

mod categorization;
mod stats;
mod types;

pub use categorization::{categorize_api_code, categorize_reqwest_error};
pub use stats::ProcessingStats;
pub use types::{CoreError, CoreResult, ErrorKind};
