//! The workflow orchestrator: a strictly sequential phase state machine.
//!
//! Phases run in a fixed order; each phase's precondition is the prior
//! phase's successful completion. A failing phase stops the pipeline and
//! marks the execution failed. Exactly one execution context exists per
//! in-flight run: it is registered when the run starts and removed however
//! the run ends, so the live table never leaks entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::ads::AdsApiIntegration;
use crate::config::EXTRACTION_MAX_RETRIES;
use crate::error_handling::{CoreError, CoreResult};
use crate::extraction::{ExtractionRequest, LinkResult, UrlExtractionEngine};
use crate::mapping::{AdMappingConfig, AdMappingEngine, AdMappingRule, MappingStrategy};
use crate::models::TrackingConfiguration;
use crate::notify::{ExecutionNotification, NotificationSink};
use crate::storage::{set_item, KeyValueStore, NS_CONFIGURATIONS, NS_EXECUTIONS};

use super::context::{ExecutionContext, ExecutionStatus};
use super::events::{WorkflowEvent, WorkflowEvents};
use super::phase::{PhaseName, PhaseStatus, WorkflowPhase};
use super::result::{WorkflowResult, WorkflowSummary};

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Master switch for the notification phase.
    pub notifications_enabled: bool,
    /// Attempts per execution handed to the extraction engine.
    pub extraction_max_retries: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            extraction_max_retries: EXTRACTION_MAX_RETRIES,
        }
    }
}

/// Execution summary persisted to the store when a run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredExecution {
    pub execution_id: String,
    pub config_id: String,
    pub status: String,
    pub summary: WorkflowSummary,
    pub finished_at_ms: i64,
}

/// Mutable state threaded through one run's phases.
struct RunState {
    started: std::time::Instant,
    phases: Vec<WorkflowPhase>,
    link_results: Vec<LinkResult>,
    ad_update_summaries: Vec<crate::ads::AdUpdateSummary>,
    errors: Vec<String>,
}

impl RunState {
    fn new() -> Self {
        RunState {
            started: std::time::Instant::now(),
            phases: PhaseName::ALL.iter().map(|p| WorkflowPhase::new(*p)).collect(),
            link_results: Vec::new(),
            ad_update_summaries: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Sequences link resolution, ad mapping, and ad updates for one
/// configuration at a time.
pub struct WorkflowOrchestrator {
    extraction: Arc<UrlExtractionEngine>,
    mapping: Arc<AdMappingEngine>,
    ads: Arc<AdsApiIntegration>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationSink>,
    executions: RwLock<HashMap<String, ExecutionContext>>,
    events: WorkflowEvents,
    settings: WorkflowSettings,
    execution_seq: AtomicU64,
}

impl WorkflowOrchestrator {
    pub fn new(
        extraction: Arc<UrlExtractionEngine>,
        mapping: Arc<AdMappingEngine>,
        ads: Arc<AdsApiIntegration>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationSink>,
        settings: WorkflowSettings,
    ) -> Self {
        WorkflowOrchestrator {
            extraction,
            mapping,
            ads,
            store,
            notifier,
            executions: RwLock::new(HashMap::new()),
            events: WorkflowEvents::default(),
            settings,
            execution_seq: AtomicU64::new(0),
        }
    }

    /// Subscribes to phase transitions and context snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Snapshots of every in-flight execution.
    pub async fn active_executions(&self) -> Vec<ExecutionContext> {
        self.executions.read().await.values().cloned().collect()
    }

    /// Snapshot of one in-flight execution.
    pub async fn execution(&self, execution_id: &str) -> Option<ExecutionContext> {
        self.executions.read().await.get(execution_id).cloned()
    }

    /// Cancels an in-flight execution.
    ///
    /// Cancellation is cooperative: the context is marked cancelled and
    /// removed from the live table, and the run stops at its next
    /// between-phase check. In-flight browser or API calls are not
    /// interrupted.
    pub async fn cancel(&self, execution_id: &str) -> bool {
        let removed = self.executions.write().await.remove(execution_id);
        match removed {
            Some(mut context) => {
                context.status = ExecutionStatus::Cancelled;
                log::info!("Execution {execution_id} cancelled");
                self.events.publish(WorkflowEvent::Progress {
                    snapshot: Box::new(context),
                });
                true
            }
            None => false,
        }
    }

    /// Runs the whole workflow for one configuration.
    ///
    /// Never panics out of the phase loop: the outcome, including the phase
    /// audit trail and any errors, is always returned as a
    /// [`WorkflowResult`].
    pub async fn run(&self, configuration: &TrackingConfiguration) -> WorkflowResult {
        let started_at_ms = Utc::now().timestamp_millis();
        let seq = self.execution_seq.fetch_add(1, Ordering::SeqCst);
        let execution_id = format!("exec_{started_at_ms}_{seq}");

        let context = ExecutionContext::new(
            execution_id.clone(),
            configuration.id.clone(),
            configuration.name.clone(),
            started_at_ms,
        );
        self.executions
            .write()
            .await
            .insert(execution_id.clone(), context);
        log::info!(
            "Starting execution {execution_id} for configuration \"{}\"",
            configuration.name
        );

        let mut state = RunState::new();
        let status = self
            .execute_phases(&execution_id, configuration, &mut state)
            .await;

        // Removal runs on every outcome; a failed phase must not leak the
        // live-table entry.
        self.executions.write().await.remove(&execution_id);
        self.events.publish(WorkflowEvent::Finished {
            execution_id: execution_id.clone(),
            status,
        });

        let summary = WorkflowSummary::compute(
            &state.link_results,
            &state.ad_update_summaries,
            state.started.elapsed().as_millis() as u64,
        );
        log::info!(
            "Execution {execution_id} finished with status {status}: {}/{} link execution(s) succeeded",
            summary.successful_links,
            summary.total_links
        );

        WorkflowResult {
            execution_id,
            status,
            phases: state.phases,
            link_results: state.link_results,
            ad_update_summaries: state.ad_update_summaries,
            summary,
            errors: state.errors,
        }
    }

    async fn execute_phases(
        &self,
        execution_id: &str,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> ExecutionStatus {
        for (index, name) in PhaseName::ALL.iter().enumerate() {
            // Cooperative cancellation: checked between phases.
            if !self.is_live(execution_id).await {
                log::info!("Execution {execution_id} cancelled; stopping before {name}");
                return ExecutionStatus::Cancelled;
            }

            state.phases[index].start();
            self.update_context(execution_id, |ctx| ctx.current_phase = *name)
                .await;
            self.events.publish(WorkflowEvent::PhaseStarted {
                execution_id: execution_id.to_string(),
                phase: *name,
            });
            log::debug!("Phase {name} started for {execution_id}");

            match self.run_phase(*name, execution_id, configuration, state).await {
                Ok(()) => {
                    state.phases[index].complete();
                    let progress = (((index + 1) * 100) / PhaseName::ALL.len()) as u8;
                    let link_results = state.link_results.clone();
                    let summaries = state.ad_update_summaries.clone();
                    self.update_context(execution_id, move |ctx| {
                        ctx.progress = progress;
                        ctx.link_results = link_results;
                        ctx.ad_update_summaries = summaries;
                    })
                    .await;
                    self.events.publish(WorkflowEvent::PhaseCompleted {
                        execution_id: execution_id.to_string(),
                        phase: *name,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    state.phases[index].fail(message.clone());
                    state.errors.push(format!("{name}: {message}"));
                    let error_for_ctx = message.clone();
                    self.update_context(execution_id, move |ctx| {
                        ctx.status = ExecutionStatus::Failed;
                        ctx.error = Some(error_for_ctx);
                    })
                    .await;
                    self.events.publish(WorkflowEvent::PhaseFailed {
                        execution_id: execution_id.to_string(),
                        phase: *name,
                        error: message.clone(),
                    });
                    log::error!("Phase {name} failed for {execution_id}: {message}");
                    return ExecutionStatus::Failed;
                }
            }
        }
        ExecutionStatus::Completed
    }

    async fn run_phase(
        &self,
        phase: PhaseName,
        execution_id: &str,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        match phase {
            PhaseName::Initialization => self.phase_initialization(configuration),
            PhaseName::LinkProcessing => self.phase_link_processing(configuration, state).await,
            PhaseName::UrlExtraction => self.phase_url_extraction(configuration, state),
            PhaseName::AdMapping => self.phase_ad_mapping(configuration).await,
            PhaseName::GoogleAdsUpdate => self.phase_ads_update(configuration, state).await,
            PhaseName::Verification => self.phase_verification(state),
            PhaseName::Notification => {
                self.phase_notification(execution_id, configuration, state).await
            }
            PhaseName::Completion => self.phase_completion(execution_id, configuration, state).await,
        }
    }

    /// Validates the configuration before any side effect occurs.
    fn phase_initialization(&self, configuration: &TrackingConfiguration) -> CoreResult<()> {
        let validation = configuration.validate();
        if !validation.is_valid() {
            return Err(CoreError::validation(format!(
                "configuration \"{}\" is invalid: {}",
                configuration.name,
                validation.errors().join("; ")
            )));
        }
        Ok(())
    }

    /// Resolves every original link, once per link; repetition happens
    /// inside the extraction engine. A link that cannot be resolved at all
    /// becomes `repeat_count` synthetic failed results instead of aborting
    /// the run.
    async fn phase_link_processing(
        &self,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        for url in &configuration.original_urls {
            let request = ExtractionRequest {
                environment_id: configuration.environment_id.clone(),
                original_url: url.clone(),
                repeat_count: configuration.repeat_count,
                max_retries: self.settings.extraction_max_retries,
            };
            match self.extraction.extract_final_url(&request).await {
                Ok(mut results) => state.link_results.append(&mut results),
                Err(err) => {
                    log::warn!(
                        "Link {url} could not be processed ({err}); recording {} failed execution(s)",
                        configuration.repeat_count
                    );
                    for execution in 1..=configuration.repeat_count {
                        state
                            .link_results
                            .push(LinkResult::failed(url, execution, err.to_string(), 0, 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Consolidates extraction output: pads missing executions with
    /// synthetic failures so every link accounts for exactly `repeat_count`
    /// results, and logs the extraction totals.
    fn phase_url_extraction(
        &self,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        for url in &configuration.original_urls {
            for execution in 1..=configuration.repeat_count {
                let present = state
                    .link_results
                    .iter()
                    .any(|r| &r.original_url == url && r.execution_number == execution);
                if !present {
                    state.link_results.push(LinkResult::failed(
                        url,
                        execution,
                        "execution produced no result",
                        0,
                        0,
                    ));
                }
            }
        }

        let successful = state.link_results.iter().filter(|r| r.success).count();
        let validated = state.link_results.iter().filter(|r| r.validated).count();
        log::info!(
            "URL extraction consolidated: {}/{} execution(s) succeeded ({} heuristic-validated)",
            successful,
            state.link_results.len(),
            validated
        );
        Ok(())
    }

    /// Loads the configuration's ad-mapping table into the mapping engine.
    ///
    /// The table is already fully explicit (one entry per ad and execution
    /// number), so the rules are taken from it verbatim, grouped by
    /// execution; the strategy field merely describes the resulting shape.
    /// A rejected mapping fails the phase: updating ads against a broken
    /// mapping would be meaningless.
    async fn phase_ad_mapping(&self, configuration: &TrackingConfiguration) -> CoreResult<()> {
        for (url, entries) in &configuration.ad_mappings {
            if entries.is_empty() {
                continue;
            }
            let mut entries = entries.clone();
            entries.sort_by_key(|e| e.execution_number);

            // Several entries may point different ads at the same
            // execution; fold them into one rule per execution number.
            let mut rules: Vec<AdMappingRule> = Vec::new();
            for entry in &entries {
                if let Some(rule) = rules.last_mut() {
                    if rule.execution_number == entry.execution_number {
                        rule.ad_ids.push(entry.ad_id.clone());
                        continue;
                    }
                }
                rules.push(AdMappingRule {
                    execution_number: entry.execution_number,
                    ad_ids: vec![entry.ad_id.clone()],
                });
            }
            let strategy = if rules.iter().any(|rule| rule.ad_ids.len() > 1) {
                MappingStrategy::OneToMany
            } else {
                MappingStrategy::OneToOne
            };
            let ad_ids: Vec<String> = entries.iter().map(|e| e.ad_id.clone()).collect();
            let first = &entries[0];
            let mapping_config = AdMappingConfig {
                original_url: url.clone(),
                campaign_id: first.campaign_id.clone(),
                ad_group_id: first.ad_group_id.clone(),
                ad_ids,
                execution_count: configuration.repeat_count,
                strategy,
                rules,
            };

            let validation = self.mapping.configure_explicit_mapping(mapping_config).await;
            if !validation.is_valid() {
                return Err(CoreError::validation(format!(
                    "ad mapping for {url} rejected: {}",
                    validation.errors().join("; ")
                )));
            }
        }
        Ok(())
    }

    /// Pushes final URLs to every configured account. Account failures are
    /// isolated into the per-account summaries and surfaced as non-fatal
    /// errors.
    async fn phase_ads_update(
        &self,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        let summaries = self
            .ads
            .execute_ad_updates(configuration, &state.link_results)
            .await;
        for summary in &summaries {
            for error in &summary.errors {
                state
                    .errors
                    .push(format!("account {}: {error}", summary.account_id));
            }
        }
        state.ad_update_summaries = summaries;
        Ok(())
    }

    /// Cross-checks link results against the applied updates and records
    /// per-account shortfalls. Mismatches are reported, not fatal.
    fn phase_verification(&self, state: &mut RunState) -> CoreResult<()> {
        let successful_links = state.link_results.iter().filter(|r| r.success).count();
        let attempted: usize = state
            .ad_update_summaries
            .iter()
            .map(|s| s.total_updates)
            .sum();
        let succeeded: usize = state
            .ad_update_summaries
            .iter()
            .map(|s| s.successful_updates)
            .sum();
        log::info!(
            "Verification: {successful_links} successful link execution(s), {attempted} ad update(s) attempted, {succeeded} applied"
        );

        for summary in &state.ad_update_summaries {
            if summary.failed_updates > 0 {
                state.errors.push(format!(
                    "account {}: {} of {} ad update(s) failed",
                    summary.account_id, summary.failed_updates, summary.total_updates
                ));
            }
        }
        Ok(())
    }

    /// Sends the run summary to the notification sink. Best-effort: sink
    /// failures are logged and never fail the workflow. Skippable via the
    /// settings switch or the configuration's own flag.
    async fn phase_notification(
        &self,
        execution_id: &str,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        if !self.settings.notifications_enabled || !configuration.notify {
            log::info!("Notification skipped for {execution_id}");
            return Ok(());
        }

        // Every failure-capable phase has already completed by the time
        // notification runs, so the reported status is the run's outcome,
        // not the context's transient RUNNING state.
        let status = if state
            .phases
            .iter()
            .any(|p| p.status == PhaseStatus::Failed)
        {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };
        let total = state.link_results.len();
        let successful = state.link_results.iter().filter(|r| r.success).count();
        let notification = ExecutionNotification {
            execution_id: execution_id.to_string(),
            config_name: configuration.name.clone(),
            status: status.as_str().to_string(),
            total_links: total,
            successful_links: successful,
            failed_links: total - successful,
            ads_updated: state
                .ad_update_summaries
                .iter()
                .map(|s| s.successful_updates)
                .sum(),
            elapsed_seconds: state.started.elapsed().as_secs_f64(),
        };
        if let Err(err) = self.notifier.send_summary(&notification).await {
            log::warn!("Notification for {execution_id} failed (non-fatal): {err}");
        }
        Ok(())
    }

    /// Persists the run: updates the configuration's `last_executed` and
    /// `status`, and stores the execution summary.
    async fn phase_completion(
        &self,
        execution_id: &str,
        configuration: &TrackingConfiguration,
        state: &mut RunState,
    ) -> CoreResult<()> {
        let finished_at_ms = Utc::now().timestamp_millis();

        let mut updated = configuration.clone();
        updated.last_executed = Some(finished_at_ms);
        updated.status = Some(ExecutionStatus::Completed.as_str().to_string());
        set_item(
            self.store.as_ref(),
            NS_CONFIGURATIONS,
            &configuration.id,
            &updated,
            false,
        )
        .await?;

        let summary = WorkflowSummary::compute(
            &state.link_results,
            &state.ad_update_summaries,
            state.started.elapsed().as_millis() as u64,
        );
        let stored = StoredExecution {
            execution_id: execution_id.to_string(),
            config_id: configuration.id.clone(),
            status: ExecutionStatus::Completed.as_str().to_string(),
            summary,
            finished_at_ms,
        };
        set_item(self.store.as_ref(), NS_EXECUTIONS, execution_id, &stored, false).await?;
        Ok(())
    }

    async fn is_live(&self, execution_id: &str) -> bool {
        self.executions.read().await.contains_key(execution_id)
    }

    async fn update_context(
        &self,
        execution_id: &str,
        mutate: impl FnOnce(&mut ExecutionContext),
    ) {
        let mut executions = self.executions.write().await;
        if let Some(context) = executions.get_mut(execution_id) {
            mutate(context);
            let snapshot = context.clone();
            drop(executions);
            self.events.publish(WorkflowEvent::Progress {
                snapshot: Box::new(snapshot),
            });
        }
    }
}
