//! Configuration constants and types.

pub mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
