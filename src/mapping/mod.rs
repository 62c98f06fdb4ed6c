//! Ad mapping: binding original URLs and execution numbers to ads.

mod engine;
mod types;

pub use engine::AdMappingEngine;
pub use types::{
    AdMappingConfig, AdMappingResult, AdMappingRule, MappedAd, MappingStatistics, MappingStrategy,
    ValidationResult,
};
