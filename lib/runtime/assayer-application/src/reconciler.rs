//! Lifecycle driver for a single assessment.
//!
//! One call to [`Reconciler::reconcile`] looks at the observed state of an
//! assessment and either does nothing, recovers a stuck run, records when the
//! next scheduled run is due, or performs a run:
//!
//! ```text
//! Pending ──claim──▶ Running ──complete──▶ Completed
//!                       │                     │ (scheduled: due again)
//!                       └──stuck > 5m──▶ Failed (Timeout) ──restart──▶ Running
//! ```
//!
//! Every status write re-fetches the stored copy and is retried on conflict,
//! so concurrent reconciles of the same assessment converge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use assayer_domain::{
    Assessment, AssessmentSummary, CONDITION_READY, ClusterInfo, Condition, DEFAULT_PROFILE,
    Finding, Phase, Profile,
};
use assayer_ports::{
    AssessmentMetrics, CancelToken, Cancelled, PortSet, ReportInput, StoreError,
    ValidatorMetrics,
};

use crate::registry::Registry;
use crate::retry::{DEFAULT_STATUS_RETRIES, Mutation, UpdateOutcome, update_status};
use crate::runner::{RunError, RunReport, Runner, ValidatorRun};
use crate::schedule::{Schedule, ScheduleError};
use crate::scoring::{calculate_summary, filter_by_severity, sort_findings};

/// A run still marked Running after this long is considered abandoned.
pub const STUCK_RUN_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const RUNNING_RECHECK: Duration = Duration::from_secs(30);
pub const MISSING_START_RECHECK: Duration = Duration::from_secs(10);

const REASON_COMPLETED: &str = "Completed";
const REASON_TIMEOUT: &str = "Timeout";
const REASON_INVALID_SCHEDULE: &str = "InvalidSchedule";

/// What the caller should do after a reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileAction {
    requeue_after: Option<Duration>,
}

impl ReconcileAction {
    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
        }
    }

    /// Nothing to do until the assessment changes.
    pub fn await_change() -> Self {
        Self::default()
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to load assessment {name:?}")]
    Load {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update status of assessment {name:?}")]
    Status {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub status_retries: u32,
    /// Profile used when an assessment names none or an unknown one.
    pub default_profile: String,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            status_retries: DEFAULT_STATUS_RETRIES,
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

pub struct Reconciler {
    ports: PortSet,
    runner: Runner,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(ports: PortSet, registry: Arc<Registry>, settings: ReconcilerSettings) -> Self {
        Self {
            ports,
            runner: Runner::new(registry),
            settings,
        }
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    /// Loads the stored copy of `name` and reconciles it. A missing
    /// assessment is not an error.
    pub async fn reconcile_by_name(
        &self,
        cancel: &CancelToken,
        name: &str,
    ) -> Result<ReconcileAction, ReconcileError> {
        let assessment = self
            .ports
            .store
            .get(name)
            .await
            .map_err(|source| ReconcileError::Load {
                name: name.to_string(),
                source,
            })?;
        match assessment {
            Some(assessment) => self.reconcile(cancel, &assessment).await,
            None => {
                debug!(assessment = %name, "assessment not found, nothing to reconcile");
                Ok(ReconcileAction::await_change())
            }
        }
    }

    pub async fn reconcile(
        &self,
        cancel: &CancelToken,
        assessment: &Assessment,
    ) -> Result<ReconcileAction, ReconcileError> {
        cancel.check()?;
        let name = assessment.name.as_str();
        let scheduled = assessment.spec.is_scheduled();
        let restart = timed_out(assessment);

        match assessment.status.phase {
            Phase::Running => return self.check_running(name).await,
            // Only runs failed by the stuck-run detector are restarted.
            Phase::Completed | Phase::Failed if !scheduled && !restart => {
                debug!(assessment = %name, phase = %assessment.status.phase, "one-time assessment already finished");
                return Ok(ReconcileAction::await_change());
            }
            _ => {}
        }

        if assessment.spec.suspend {
            debug!(assessment = %name, "assessment suspended");
            return Ok(ReconcileAction::await_change());
        }
        if restart {
            info!(assessment = %name, "restarting timed-out run");
        }

        let schedule = if scheduled {
            let schedule = match Schedule::parse(&assessment.spec.schedule) {
                Ok(schedule) => schedule,
                Err(err) => return self.fail_invalid_schedule(name, &err).await,
            };
            if !restart
                && let Some(wait) = self.wait_for_schedule(assessment, &schedule).await?
            {
                return Ok(ReconcileAction::requeue(wait));
            }
            Some(schedule)
        } else {
            None
        };

        self.execute(cancel, assessment, schedule.as_ref()).await
    }

    /// Re-examines a run another reconcile claimed. Only the stored copy is
    /// trusted here since the caller's copy may predate completion.
    async fn check_running(&self, name: &str) -> Result<ReconcileAction, ReconcileError> {
        let current = self
            .ports
            .store
            .get(name)
            .await
            .map_err(|source| ReconcileError::Load {
                name: name.to_string(),
                source,
            })?;
        let Some(current) = current else {
            return Ok(ReconcileAction::await_change());
        };
        match current.status.phase {
            Phase::Running => {}
            phase if phase.is_finished() => return Ok(ReconcileAction::await_change()),
            _ => return Ok(ReconcileAction::requeue(Duration::ZERO)),
        }

        let Some(started) = current.status.last_run_time else {
            return Ok(ReconcileAction::requeue(MISSING_START_RECHECK));
        };
        let now = self.ports.clock.now();
        let elapsed = elapsed_between(started, now);
        if elapsed < STUCK_RUN_TIMEOUT {
            return Ok(ReconcileAction::requeue(RUNNING_RECHECK));
        }

        warn!(assessment = %name, elapsed_secs = elapsed.as_secs(), "run stuck in Running, marking failed");
        let message = format!(
            "Assessment timed out: run started at {} did not complete within {}s",
            started.to_rfc3339(),
            STUCK_RUN_TIMEOUT.as_secs()
        );
        self.write_status(name, |stored| {
            if stored.status.phase != Phase::Running || stored.status.last_run_time != Some(started)
            {
                return Mutation::Skip;
            }
            stored.status.phase = Phase::Failed;
            stored.status.message = message.clone();
            stored
                .status
                .set_condition(Condition::ready(false, REASON_TIMEOUT, message.clone(), now));
            Mutation::Apply
        })
        .await?;
        Ok(ReconcileAction::requeue(Duration::ZERO))
    }

    /// Returns how long to wait when the next scheduled run is not yet due,
    /// persisting `nextRunTime` along the way.
    async fn wait_for_schedule(
        &self,
        assessment: &Assessment,
        schedule: &Schedule,
    ) -> Result<Option<Duration>, ReconcileError> {
        let now = self.ports.clock.now();
        let Some(last_run) = assessment.status.last_run_time else {
            return Ok(None);
        };
        let next_run = match schedule.next_after(last_run) {
            Ok(next_run) => next_run,
            Err(err) => {
                warn!(assessment = %assessment.name, error = %err, "no upcoming occurrence for schedule");
                return Ok(None);
            }
        };
        if now >= next_run {
            return Ok(None);
        }

        if assessment.status.next_run_time != Some(next_run) {
            self.write_status(&assessment.name, |stored| {
                if stored.status.next_run_time == Some(next_run) {
                    return Mutation::Skip;
                }
                stored.status.next_run_time = Some(next_run);
                Mutation::Apply
            })
            .await?;
        }
        let wait = elapsed_between(now, next_run);
        debug!(assessment = %assessment.name, next_run = %next_run, wait_secs = wait.as_secs(), "next run not yet due");
        Ok(Some(wait))
    }

    async fn fail_invalid_schedule(
        &self,
        name: &str,
        err: &ScheduleError,
    ) -> Result<ReconcileAction, ReconcileError> {
        warn!(assessment = %name, error = %err, "invalid schedule");
        let message = err.to_string();
        let now = self.ports.clock.now();
        self.write_status(name, |stored| {
            if stored.status.phase == Phase::Failed && stored.status.message == message {
                return Mutation::Skip;
            }
            stored.status.phase = Phase::Failed;
            stored.status.message = message.clone();
            stored.status.next_run_time = None;
            stored.status.set_condition(Condition::ready(
                false,
                REASON_INVALID_SCHEDULE,
                message.clone(),
                now,
            ));
            Mutation::Apply
        })
        .await?;
        Ok(ReconcileAction::await_change())
    }

    async fn execute(
        &self,
        cancel: &CancelToken,
        assessment: &Assessment,
        schedule: Option<&Schedule>,
    ) -> Result<ReconcileAction, ReconcileError> {
        let name = assessment.name.as_str();
        let started_at = self.ports.clock.now();
        let started = Instant::now();
        let observed_last_run = assessment.status.last_run_time;

        let claim = self
            .write_status(name, |stored| {
                // Someone else is running it or has run it since we looked.
                if stored.status.phase == Phase::Running
                    || stored.status.last_run_time != observed_last_run
                {
                    return Mutation::Skip;
                }
                stored.status.phase = Phase::Running;
                stored.status.last_run_time = Some(started_at);
                stored.status.message = "Assessment is running".to_string();
                Mutation::Apply
            })
            .await?;
        match claim {
            UpdateOutcome::Updated(_) => {}
            UpdateOutcome::Missing => return Ok(ReconcileAction::await_change()),
            UpdateOutcome::Unchanged(current) if current.status.phase == Phase::Running => {
                return Ok(ReconcileAction::requeue(RUNNING_RECHECK));
            }
            UpdateOutcome::Unchanged(_) => return Ok(ReconcileAction::requeue(Duration::ZERO)),
        }

        let profile = self.resolve_profile(&assessment.spec.profile);
        info!(assessment = %name, profile = %profile.name, "starting assessment run");

        let cluster_info = self.collect_cluster_info(cancel, name).await;

        let run = match self
            .runner
            .run(
                cancel,
                Arc::clone(&self.ports.reader),
                &profile,
                &assessment.spec.validators,
            )
            .await
        {
            Ok(run) => run,
            Err(RunError::Cancelled(cancelled)) => {
                warn!(assessment = %name, "run cancelled, leaving it for stuck-run recovery");
                return Err(cancelled.into());
            }
        };
        let RunReport {
            findings,
            executions,
        } = run;

        let mut findings = filter_by_severity(findings, &assessment.spec.min_severity);
        sort_findings(&mut findings);
        let summary = calculate_summary(&findings, &profile.name);

        let completed_at = self.ports.clock.now();
        if assessment.spec.report_storage.enabled {
            self.publish_reports(assessment, completed_at, &findings, &summary, &cluster_info)
                .await;
        }

        let next_run_time = schedule.and_then(|schedule| match schedule.next_after(started_at) {
            Ok(next) => Some(next),
            Err(err) => {
                warn!(assessment = %name, error = %err, "no upcoming occurrence for schedule");
                None
            }
        });
        let message = completion_message(&summary);
        let outcome = self
            .write_status(name, |stored| {
                stored.status.phase = Phase::Completed;
                stored.status.last_run_time = Some(started_at);
                stored.status.next_run_time = next_run_time;
                stored.status.cluster_info = Some(cluster_info.clone());
                stored.status.summary = Some(summary.clone());
                stored.status.findings = findings.clone();
                stored.status.message = message.clone();
                stored.status.set_condition(Condition::ready(
                    true,
                    REASON_COMPLETED,
                    message.clone(),
                    completed_at,
                ));
                Mutation::Apply
            })
            .await?;
        if outcome == UpdateOutcome::Missing {
            info!(assessment = %name, "assessment deleted during run, discarding results");
            return Ok(ReconcileAction::await_change());
        }

        info!(
            assessment = %name,
            checks = summary.total_checks,
            score = ?summary.score,
            "assessment run completed"
        );
        let duration = started.elapsed();
        self.record_metrics(name, &summary, &cluster_info, &executions, completed_at, duration);

        Ok(match next_run_time {
            Some(next) => {
                ReconcileAction::requeue(elapsed_between(self.ports.clock.now(), next))
            }
            None => ReconcileAction::await_change(),
        })
    }

    /// Resolves `requested`, falling back to the configured default profile
    /// and then to production.
    fn resolve_profile(&self, requested: &str) -> Profile {
        let requested = requested.trim();
        if !requested.is_empty() {
            if let Some(profile) = Profile::lookup(requested) {
                return profile;
            }
            warn!(profile = %requested, default = %self.settings.default_profile, "unknown profile, using default");
        }
        Profile::lookup(&self.settings.default_profile).unwrap_or_else(|| {
            warn!(profile = %self.settings.default_profile, "unknown default profile, using production");
            Profile::production()
        })
    }

    async fn collect_cluster_info(&self, cancel: &CancelToken, name: &str) -> ClusterInfo {
        let mut info = match self.ports.inspector.cluster_info(cancel).await {
            Ok(info) => info,
            Err(err) => {
                warn!(assessment = %name, error = %format!("{err:#}"), "failed to collect cluster info");
                ClusterInfo::default()
            }
        };
        info.collected_at = Some(self.ports.clock.now());
        info
    }

    async fn publish_reports(
        &self,
        assessment: &Assessment,
        generated_at: DateTime<Utc>,
        findings: &[Finding],
        summary: &AssessmentSummary,
        cluster_info: &ClusterInfo,
    ) {
        let input = ReportInput {
            name: assessment.report_name(),
            assessment: &assessment.name,
            generated_at,
            findings,
            summary,
            cluster_info,
        };
        for format in &assessment.spec.report_storage.formats {
            let Some(assembler) = self
                .ports
                .assemblers
                .iter()
                .find(|assembler| assembler.format() == *format)
            else {
                warn!(assessment = %assessment.name, %format, "no report assembler for format, skipping");
                continue;
            };
            let artifact = match assembler.build(&input) {
                Ok(artifact) => artifact,
                Err(err) => {
                    warn!(assessment = %assessment.name, %format, error = %format!("{err:#}"), "failed to build report");
                    continue;
                }
            };
            match self.ports.reports.store(&artifact).await {
                Ok(()) => {
                    info!(assessment = %assessment.name, artifact = %artifact.file_name(), "stored report");
                }
                Err(err) => {
                    warn!(assessment = %assessment.name, %format, error = %format!("{err:#}"), "failed to store report");
                }
            }
        }
    }

    fn record_metrics(
        &self,
        name: &str,
        summary: &AssessmentSummary,
        cluster_info: &ClusterInfo,
        executions: &[ValidatorRun],
        timestamp: DateTime<Utc>,
        duration: Duration,
    ) {
        let metrics = &self.ports.metrics;
        metrics.record_assessment(&AssessmentMetrics {
            assessment: name,
            profile: &summary.profile_used,
            summary,
            timestamp,
            duration,
        });
        metrics.record_cluster_info(name, cluster_info);
        for execution in executions {
            metrics.record_validator(&ValidatorMetrics {
                assessment: name,
                validator: &execution.validator,
                findings: execution.findings,
                errored: execution.errored,
                duration: execution.duration,
            });
        }
    }

    async fn write_status<F>(&self, name: &str, mutate: F) -> Result<UpdateOutcome, ReconcileError>
    where
        F: Fn(&mut Assessment) -> Mutation + Sync,
    {
        update_status(
            self.ports.store.as_ref(),
            name,
            self.settings.status_retries,
            mutate,
        )
        .await
        .map_err(|source| ReconcileError::Status {
            name: name.to_string(),
            source,
        })
    }
}

fn completion_message(summary: &AssessmentSummary) -> String {
    match summary.score {
        Some(score) => format!(
            "Assessment completed: {} checks, score {score}",
            summary.total_checks
        ),
        None => "Assessment completed: no checks reported".to_string(),
    }
}

/// A run force-failed by the stuck-run detector, which may start again.
fn timed_out(assessment: &Assessment) -> bool {
    assessment.status.phase == Phase::Failed
        && assessment
            .status
            .condition(CONDITION_READY)
            .is_some_and(|ready| ready.reason == REASON_TIMEOUT)
}

/// Non-negative wall-clock distance from `from` to `to`.
fn elapsed_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
