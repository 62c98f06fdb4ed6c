//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `changelink` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use changelink::initialization::init_logger_with;
use changelink::{run_tracking, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file when present.
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_tracking(config).await {
        Ok(report) => {
            println!(
                "Execution {} finished with status {} - see database for details",
                report.execution_id, report.status
            );
            println!("Results saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("changelink error: {e:#}");
            process::exit(1);
        }
    }
}
