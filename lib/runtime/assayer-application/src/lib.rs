//! Assessment engine: registry, runner, scoring and the reconcile loop.

pub mod controller;
pub mod memory_store;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod schedule;
pub mod scoring;
pub mod telemetry;

pub use controller::{Controller, ControllerSettings, backoff_delay};
pub use memory_store::InMemoryAssessmentStore;
pub use reconciler::{
    MISSING_START_RECHECK, RUNNING_RECHECK, ReconcileAction, ReconcileError, Reconciler,
    ReconcilerSettings, STUCK_RUN_TIMEOUT,
};
pub use registry::{Registry, RegistryError};
pub use retry::{
    ConflictError, DEFAULT_STATUS_RETRIES, Mutation, UpdateOutcome, retry_on_conflict,
    update_status,
};
pub use runner::{RunError, RunReport, Runner, ValidatorRun};
pub use schedule::{Schedule, ScheduleError};
pub use scoring::{calculate_summary, filter_by_severity, parse_min_severity, sort_findings};
pub use telemetry::LogMetricsSink;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod retry_test;
#[cfg(test)]
mod schedule_test;
