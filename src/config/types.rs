//! Configuration types and CLI options.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    AD_UPDATE_CHUNK_SIZE, DB_PATH, DEFAULT_ADS_API_URL, DEFAULT_AUTOMATION_API_URL,
    EXTRACTION_BATCH_CONCURRENCY,
};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Run configuration.
///
/// Parsed from the command line by the binary; constructible programmatically
/// (via `Default` plus struct update syntax) when the library is embedded.
///
/// # Examples
///
/// ```no_run
/// use changelink::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     config_file: PathBuf::from("campaign.json"),
///     extraction_concurrency: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "changelink",
    about = "Resolve affiliate links through isolated browser environments and push the final URLs to advertising accounts."
)]
pub struct Config {
    /// Path to the tracking configuration JSON file
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: PathBuf,

    /// SQLite database path for run history and stored configurations
    #[arg(long, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Base URL of the browser automation API
    #[arg(long, default_value = DEFAULT_AUTOMATION_API_URL)]
    pub automation_api_url: String,

    /// Base URL of the ads API gateway
    #[arg(long, default_value = DEFAULT_ADS_API_URL)]
    pub ads_api_url: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Maximum URLs extracted concurrently in batch mode
    #[arg(long, default_value_t = EXTRACTION_BATCH_CONCURRENCY)]
    pub extraction_concurrency: usize,

    /// Ad updates applied per chunk
    #[arg(long, default_value_t = AD_UPDATE_CHUNK_SIZE)]
    pub ad_chunk_size: usize,

    /// Skip the notification phase
    #[arg(long, default_value_t = false)]
    pub no_notify: bool,

    /// Print per-operation timing statistics at the end of the run
    #[arg(long, default_value_t = false)]
    pub show_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("tracking.json"),
            db_path: PathBuf::from(DB_PATH),
            automation_api_url: DEFAULT_AUTOMATION_API_URL.to_string(),
            ads_api_url: DEFAULT_ADS_API_URL.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            extraction_concurrency: EXTRACTION_BATCH_CONCURRENCY,
            ad_chunk_size: AD_UPDATE_CHUNK_SIZE,
            no_notify: false,
            show_stats: false,
        }
    }
}
