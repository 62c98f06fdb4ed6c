//! Final-URL extraction: heuristics, single-link resolution, batch mode.

mod engine;
mod heuristics;
mod types;

pub use engine::{ExtractionSettings, UrlExtractionEngine};
pub use heuristics::{FinalUrlHeuristics, HeuristicConfig};
pub use types::{
    query_map, split_url, BatchExtractionOutcome, BatchExtractionRequest, ExtractionRequest,
    ExtractionSummary, LinkResult,
};
