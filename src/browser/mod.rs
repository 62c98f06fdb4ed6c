//! Browser automation API client: environment management, session
//! start/stop with recovery, response caching.

mod cache;
mod client;
mod recovery;
mod types;

pub use cache::ResponseCache;
pub use client::{BrowserAutomationClient, BrowserClientSettings};
pub use types::{
    ApiEnvelope, BatchPartition, BrowserSession, Environment, EnvironmentGroup, EnvironmentSpec,
    EnvironmentStatus, KernelVersion, PagedList, ProxyStatus, SessionStatus,
};
