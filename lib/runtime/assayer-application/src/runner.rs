//! Validator execution with per-validator failure isolation.
//!
//! Validators run one after another. A validator that errors or panics never
//! aborts the run: it is reported as a single FAIL finding with id
//! `<validator>-error`, and the next validator starts.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use assayer_domain::{Finding, FindingStatus, Profile};
use assayer_ports::{
    CancelToken, Cancelled, ClusterReader, ValidationContext, Validator, ValidatorError,
};

use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Execution record for one validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRun {
    pub validator: String,
    pub findings: usize,
    pub errored: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub findings: Vec<Finding>,
    pub executions: Vec<ValidatorRun>,
}

#[derive(Debug, Clone)]
pub struct Runner {
    registry: Arc<Registry>,
}

impl Runner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves the validators to run. An empty selection means all of them;
    /// unknown names are skipped.
    pub fn select(&self, names: &[String]) -> Vec<Arc<dyn Validator>> {
        if names.is_empty() {
            return self.registry.list();
        }
        names
            .iter()
            .filter_map(|name| {
                let found = self.registry.get(name);
                if found.is_none() {
                    warn!(validator = %name, "validator not registered, skipping");
                }
                found
            })
            .collect()
    }

    pub async fn run(
        &self,
        cancel: &CancelToken,
        reader: Arc<dyn ClusterReader>,
        profile: &Profile,
        names: &[String],
    ) -> Result<RunReport, RunError> {
        let validators = self.select(names);
        let ctx = ValidationContext {
            cancel: cancel.clone(),
            reader,
            profile: profile.clone(),
        };

        let mut report = RunReport::default();
        for validator in validators {
            cancel.check()?;

            let name = validator.name().to_string();
            let started = Instant::now();
            let (findings, errored) = match invoke(Arc::clone(&validator), ctx.clone()).await {
                Ok(findings) => (findings, false),
                Err(failure) => {
                    warn!(validator = %name, error = %failure, "validator failed");
                    let mut findings = failure.partial;
                    findings.push(error_finding(validator.as_ref(), &failure.error));
                    (findings, true)
                }
            };
            let duration = started.elapsed();
            debug!(validator = %name, findings = findings.len(), ?duration, "validator finished");

            report.executions.push(ValidatorRun {
                validator: name,
                findings: findings.len(),
                errored,
                duration,
            });
            report.findings.extend(findings);
        }
        Ok(report)
    }
}

/// Aborts the wrapped task when dropped, so a validator does not outlive a
/// run whose future was dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the validator on its own task so a panic surfaces as a `JoinError`
/// instead of unwinding through the reconciler.
async fn invoke(
    validator: Arc<dyn Validator>,
    ctx: ValidationContext,
) -> Result<Vec<Finding>, ValidatorError> {
    let handle = tokio::spawn(async move { validator.validate(&ctx).await });
    let _abort = AbortOnDrop(handle.abort_handle());
    match handle.await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => Err(anyhow!(
            "validator panicked: {}",
            panic_message(join_error.into_panic())
        )
        .into()),
        Err(join_error) => Err(anyhow!("validator task aborted: {join_error}").into()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub fn error_finding(validator: &dyn Validator, error: &anyhow::Error) -> Finding {
    let name = validator.name();
    Finding::new(
        format!("{name}-error"),
        name,
        validator.category(),
        FindingStatus::Fail,
        format!("Validator {name} failed to complete"),
    )
    .with_description(format!("Validator {name} returned an error: {error:#}"))
    .with_impact("Checks performed by this validator are missing from the assessment.")
    .with_recommendation(
        "Inspect the engine logs and confirm the engine's identity can read the resources this validator needs.",
    )
}
