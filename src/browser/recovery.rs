//! Session recovery flows and environment validation.
//!
//! The automation tool occasionally refuses a start because a stale session
//! is still bound to the environment. The smart start/stop flows recover
//! from that instead of surfacing the first failure to the caller.

use tokio::time::sleep;

use crate::error_handling::{CoreError, CoreResult};
use crate::retry::BatchOptions;

use super::client::BrowserAutomationClient;
use super::types::{BatchPartition, BrowserSession, Environment, EnvironmentStatus, SessionStatus};

impl BrowserAutomationClient {
    /// Validates that an environment exists and is usable.
    ///
    /// An environment is usable only when it exists and its status is
    /// `Active`; anything else is a validation failure with a
    /// human-readable reason.
    pub async fn validate_environment(&self, environment_id: &str) -> CoreResult<Environment> {
        if environment_id.trim().is_empty() {
            return Err(CoreError::validation("environment id is empty"));
        }
        match self.get_environment(environment_id).await? {
            None => Err(CoreError::validation(format!(
                "environment \"{environment_id}\" does not exist"
            ))),
            Some(env) if env.status == EnvironmentStatus::Active => Ok(env),
            Some(env) => Err(CoreError::validation(format!(
                "environment \"{environment_id}\" is not usable: status is {}",
                env.status
            ))),
        }
    }

    /// Starts a browser session, recovering from a failed first attempt.
    ///
    /// On failure: query the session status, stop any stale session, wait,
    /// re-validate the environment, and try the start once more before
    /// giving up.
    pub async fn smart_start_browser(&self, environment_id: &str) -> CoreResult<BrowserSession> {
        match self.start_browser(environment_id).await {
            Ok(session) => Ok(session),
            Err(first_err) => {
                log::warn!(
                    "Browser start failed for environment {environment_id} ({first_err}), attempting recovery"
                );

                if let Ok(SessionStatus::Active) = self.browser_status(environment_id).await {
                    if let Err(stop_err) = self.stop_browser(environment_id).await {
                        log::warn!(
                            "Recovery stop failed for environment {environment_id}: {stop_err}"
                        );
                    }
                }

                sleep(self.settings().recovery_wait).await;
                self.validate_environment(environment_id).await?;

                self.start_browser(environment_id).await.map_err(|retry_err| {
                    log::error!(
                        "Browser start recovery failed for environment {environment_id}: {retry_err}"
                    );
                    retry_err
                })
            }
        }
    }

    /// Stops a browser session, tolerating a stubborn one.
    ///
    /// Stops, waits for the session to settle, and re-checks the status. If
    /// the session is still active: with `force_kill`, the stop is retried
    /// once more and a persistent session is an error; without it, the
    /// leftover session is logged and the call succeeds, since a stop
    /// failure must not be fatal to the caller unless explicitly requested.
    pub async fn smart_stop_browser(&self, environment_id: &str, force_kill: bool) -> CoreResult<()> {
        if let Err(err) = self.stop_browser(environment_id).await {
            log::warn!("Browser stop failed for environment {environment_id}: {err}");
        }

        sleep(self.settings().stop_settle).await;

        match self.browser_status(environment_id).await {
            Ok(SessionStatus::Inactive) | Err(_) => Ok(()),
            Ok(SessionStatus::Active) if force_kill => {
                log::warn!(
                    "Session for environment {environment_id} still active, forcing another stop"
                );
                self.stop_browser(environment_id).await?;
                Ok(())
            }
            Ok(SessionStatus::Active) => {
                log::warn!(
                    "Session for environment {environment_id} still active after stop; continuing"
                );
                Ok(())
            }
        }
    }

    /// Starts sessions for several environments with bounded concurrency.
    ///
    /// Failures never abort unrelated environments; the outcome partitions
    /// every id into successful/failed.
    pub async fn batch_start_browsers(&self, environment_ids: &[String]) -> BatchPartition {
        let operations: Vec<_> = environment_ids
            .iter()
            .map(|id| {
                let id = id.clone();
                move || async move { self.smart_start_browser(&id).await }
            })
            .collect();

        let options = BatchOptions {
            concurrency: self.settings().batch_concurrency,
            timeout: None,
            fail_fast: false,
        };
        let results = self.retry().execute_batch(operations, &options).await;
        Self::partition(environment_ids, results.into_iter().map(|r| r.map(|_| ())))
    }

    /// Stops sessions for several environments with bounded concurrency.
    pub async fn batch_stop_browsers(
        &self,
        environment_ids: &[String],
        force_kill: bool,
    ) -> BatchPartition {
        let operations: Vec<_> = environment_ids
            .iter()
            .map(|id| {
                let id = id.clone();
                move || async move { self.smart_stop_browser(&id, force_kill).await }
            })
            .collect();

        let options = BatchOptions {
            concurrency: self.settings().batch_concurrency,
            timeout: None,
            fail_fast: false,
        };
        let results = self.retry().execute_batch(operations, &options).await;
        Self::partition(environment_ids, results.into_iter())
    }

    fn partition(
        environment_ids: &[String],
        results: impl Iterator<Item = CoreResult<()>>,
    ) -> BatchPartition {
        let mut partition = BatchPartition::default();
        for (id, result) in environment_ids.iter().zip(results) {
            match result {
                Ok(()) => partition.successful.push(id.clone()),
                Err(err) => partition.failed.push((id.clone(), err.to_string())),
            }
        }
        partition
    }
}
