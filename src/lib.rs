//! changelink library: execution orchestration for affiliate-link rewriting.
//!
//! This library resolves affiliate/tracking links to their final destination
//! URLs through isolated browser environments and pushes the results to
//! advertising accounts, under retry/backoff, circuit breaking, and
//! partial-failure semantics.
//!
//! # Example
//!
//! ```no_run
//! use changelink::{run_tracking, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     config_file: std::path::PathBuf::from("campaign.json"),
//!     ..Default::default()
//! };
//!
//! let report = run_tracking(config).await?;
//! println!(
//!     "Execution {}: {}/{} link executions succeeded, {} ads updated",
//!     report.execution_id, report.successful_links, report.total_links, report.ads_updated
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions from an async context.

#![warn(missing_docs)]

pub mod ads;
mod app;
pub mod browser;
pub mod config;
pub mod error_handling;
pub mod extraction;
pub mod initialization;
pub mod mapping;
mod models;
pub mod notify;
pub mod retry;
pub mod storage;
pub mod workflow;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{CoreError, CoreResult, ErrorKind};
pub use models::{AdMappingEntry, TrackingConfiguration};
pub use run::{run_tracking, TrackingReport};
pub use storage::query_run_history;

// Internal run module (wires the components together for one CLI run)
mod run {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use chrono::Utc;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    use crate::ads::{AdsApiClient, AdsApiIntegration, AdsSettings, HttpAdsApiClient};
    use crate::app::{print_error_statistics, print_operation_statistics, print_simple_summary};
    use crate::browser::{BrowserAutomationClient, BrowserClientSettings};
    use crate::config::{Config, LOGGING_INTERVAL_SECS};
    use crate::error_handling::ProcessingStats;
    use crate::extraction::{
        ExtractionSettings, FinalUrlHeuristics, HeuristicConfig, UrlExtractionEngine,
    };
    use crate::initialization::{init_client, init_redirect_client};
    use crate::mapping::AdMappingEngine;
    use crate::models::TrackingConfiguration;
    use crate::notify::{LogNotificationSink, NotificationSink};
    use crate::retry::RetryManager;
    use crate::storage::{
        init_db_pool, insert_run_record, run_migrations, KeyValueStore, RunRecord,
        SqliteKeyValueStore,
    };
    use crate::workflow::{
        ExecutionContext, WorkflowEvent, WorkflowOrchestrator, WorkflowSettings,
    };

    /// Results of one tracking run.
    #[derive(Debug, Clone)]
    pub struct TrackingReport {
        /// Execution identifier (format: `exec_<timestamp_millis>_<seq>`)
        pub execution_id: String,
        /// Terminal status of the run
        pub status: String,
        /// Link executions attempted (links × repeat count)
        pub total_links: usize,
        /// Link executions that resolved successfully
        pub successful_links: usize,
        /// Link executions that failed
        pub failed_links: usize,
        /// Ad updates applied
        pub ads_updated: usize,
        /// Path to the SQLite database containing run history
        pub db_path: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs one tracking configuration end to end.
    ///
    /// This is the main entry point for the library. It loads the tracking
    /// configuration from the configured JSON file, wires up the browser
    /// client, engines, and orchestrator, runs the workflow, and persists
    /// the run summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// database initialization fails, or HTTP clients cannot be built.
    /// Workflow-level failures do not error here; they are reported through
    /// the returned [`TrackingReport`]'s status.
    pub async fn run_tracking(config: Config) -> Result<TrackingReport> {
        let raw = tokio::fs::read_to_string(&config.config_file)
            .await
            .context("Failed to read tracking configuration file")?;
        let tracking: TrackingConfiguration =
            serde_json::from_str(&raw).context("Failed to parse tracking configuration")?;

        let pool = init_db_pool(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(pool.clone()));

        let retry = Arc::new(RetryManager::default());
        let stats = Arc::new(ProcessingStats::new());

        let http = init_client(None).context("Failed to initialize HTTP client")?;
        let browser = Arc::new(BrowserAutomationClient::new(
            (*http).clone(),
            BrowserClientSettings {
                base_url: config.automation_api_url.clone(),
                ..Default::default()
            },
            Arc::clone(&retry),
        ));
        let cache_cleanup = browser.cache().start_cleanup(None);

        let heuristics = FinalUrlHeuristics::from_config(&HeuristicConfig::default())
            .context("Failed to compile final-URL heuristics")?;
        let nav_client =
            init_redirect_client(None).context("Failed to initialize redirect client")?;
        let extraction = Arc::new(UrlExtractionEngine::new(
            Arc::clone(&browser),
            nav_client,
            heuristics,
            ExtractionSettings::default(),
            Arc::clone(&stats),
        ));

        let mapping = Arc::new(AdMappingEngine::new());
        let ads_client: Arc<dyn AdsApiClient> = Arc::new(HttpAdsApiClient::new(
            (*http).clone(),
            config.ads_api_url.clone(),
        ));
        let ads = Arc::new(AdsApiIntegration::new(
            ads_client,
            Arc::clone(&retry),
            Arc::clone(&mapping),
            AdsSettings {
                chunk_size: config.ad_chunk_size,
                ..Default::default()
            },
        ));

        let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);
        let orchestrator = WorkflowOrchestrator::new(
            extraction,
            Arc::clone(&mapping),
            ads,
            Arc::clone(&store),
            notifier,
            WorkflowSettings {
                notifications_enabled: !config.no_notify,
                ..Default::default()
            },
        );

        // Periodic progress line fed by the orchestrator's event stream.
        let cancel = CancellationToken::new();
        let progress_token = cancel.child_token();
        let mut receiver = orchestrator.subscribe();
        let progress_task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL_SECS));
            let mut last: Option<ExecutionContext> = None;
            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Ok(WorkflowEvent::Progress { snapshot }) => last = Some(*snapshot),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = interval.tick() => {
                        if let Some(ctx) = &last {
                            log::info!(
                                "Execution {} in phase {} ({}%)",
                                ctx.execution_id,
                                ctx.current_phase,
                                ctx.progress
                            );
                        }
                    }
                    _ = progress_token.cancelled() => break,
                }
            }
        });

        let result = orchestrator.run(&tracking).await;

        cancel.cancel();
        let _ = progress_task.await;
        cache_cleanup.cancel();
        browser.cache().shutdown();

        let elapsed_seconds = result.summary.elapsed_ms as f64 / 1000.0;
        let record = RunRecord {
            execution_id: result.execution_id.clone(),
            config_id: tracking.id.clone(),
            config_name: tracking.name.clone(),
            status: result.status.as_str().to_string(),
            total_links: result.summary.total_links as i64,
            successful_links: result.summary.successful_links as i64,
            failed_links: result.summary.failed_links as i64,
            ads_updated: result.summary.ads_updated as i64,
            elapsed_seconds,
            started_at: Utc::now().timestamp_millis() - result.summary.elapsed_ms as i64,
        };
        insert_run_record(&pool, &record)
            .await
            .context("Failed to persist run record")?;

        print_error_statistics(&stats);
        if config.show_stats {
            print_operation_statistics(&retry.stats_snapshot().await);
        }
        print_simple_summary(
            result.summary.total_links,
            result.summary.successful_links,
            result.summary.failed_links,
            result.summary.ads_updated,
            elapsed_seconds,
        );

        Ok(TrackingReport {
            execution_id: result.execution_id,
            status: result.status.as_str().to_string(),
            total_links: result.summary.total_links,
            successful_links: result.summary.successful_links,
            failed_links: result.summary.failed_links,
            ads_updated: result.summary.ads_updated,
            db_path: config.db_path.clone(),
            elapsed_seconds,
        })
    }
}
