use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;

use assayer_domain::{Assessment, ClusterInfo, Finding, FindingStatus, ReportFormat};
use assayer_ports::{
    AssessmentMetrics, AssessmentStore, AssessmentWatch, CancelToken, Clock, MetricsSink, ReportArtifact, ReportAssembler,
    ReportInput, ReportStore, StoreError, ValidationContext, Validator, ValidatorError,
    ValidatorMetrics,
};

use crate::memory_store::InMemoryAssessmentStore;

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn finding(id: &str, status: FindingStatus) -> Finding {
    Finding::new(id, "test", "general", status, id)
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Returns a fixed set of findings and counts invocations.
pub struct StaticValidator {
    pub name: &'static str,
    pub category: &'static str,
    pub findings: Vec<Finding>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticValidator {
    pub fn new(name: &'static str, statuses: &[FindingStatus]) -> Self {
        let findings = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| {
                Finding::new(format!("{name}-{index}"), name, "general", *status, name)
            })
            .collect();
        Self {
            name,
            category: "general",
            findings,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Validator for StaticValidator {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> &str {
        self.category
    }

    fn description(&self) -> &str {
        "returns canned findings"
    }

    async fn validate(&self, _ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.findings.clone())
    }
}

/// Fails after producing `partial`.
pub struct FailingValidator {
    pub name: &'static str,
    pub partial: Vec<Finding>,
}

#[async_trait]
impl Validator for FailingValidator {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> &str {
        "general"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn validate(&self, _ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        Err(ValidatorError::with_partial(
            self.partial.clone(),
            anyhow!("api server unreachable"),
        ))
    }
}

pub struct PanickingValidator;

#[async_trait]
impl Validator for PanickingValidator {
    fn name(&self) -> &str {
        "panicky"
    }

    fn category(&self) -> &str {
        "general"
    }

    fn description(&self) -> &str {
        "always panics"
    }

    async fn validate(&self, _ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        panic!("index out of bounds");
    }
}

/// Never finishes; records when its in-flight future is dropped.
#[derive(Default)]
pub struct HangingValidator {
    pub started: Arc<AtomicBool>,
    pub dropped: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Validator for HangingValidator {
    fn name(&self) -> &str {
        "hanging"
    }

    fn category(&self) -> &str {
        "general"
    }

    fn description(&self) -> &str {
        "never returns"
    }

    async fn validate(&self, _ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        let _guard = SetOnDrop(Arc::clone(&self.dropped));
        self.started.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub events: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_assessment(&self, metrics: &AssessmentMetrics<'_>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("assessment:{}", metrics.assessment));
    }

    fn record_cluster_info(&self, assessment: &str, _info: &ClusterInfo) {
        self.events
            .lock()
            .unwrap()
            .push(format!("cluster:{assessment}"));
    }

    fn record_validator(&self, metrics: &ValidatorMetrics<'_>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("validator:{}", metrics.validator));
    }
}

pub struct StubAssembler;

impl ReportAssembler for StubAssembler {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn build(&self, input: &ReportInput<'_>) -> anyhow::Result<ReportArtifact> {
        Ok(ReportArtifact {
            name: input.name.to_string(),
            format: ReportFormat::Json,
            content_type: "application/json",
            body: format!("{}", input.findings.len()).into_bytes(),
        })
    }
}

#[derive(Default)]
pub struct RecordingReportStore {
    pub stored: Mutex<Vec<String>>,
}

#[async_trait]
impl ReportStore for RecordingReportStore {
    async fn store(&self, artifact: &ReportArtifact) -> anyhow::Result<()> {
        self.stored.lock().unwrap().push(artifact.file_name());
        Ok(())
    }
}

pub struct FailingReportStore;

#[async_trait]
impl ReportStore for FailingReportStore {
    async fn store(&self, _artifact: &ReportArtifact) -> anyhow::Result<()> {
        Err(anyhow!("bucket unavailable"))
    }
}

/// Wraps the in-memory store and rejects the first `conflicts` status writes.
pub struct ConflictingStore {
    pub inner: InMemoryAssessmentStore,
    pub conflicts: AtomicUsize,
    pub writes: AtomicUsize,
}

impl ConflictingStore {
    pub fn new(conflicts: usize) -> Self {
        Self {
            inner: InMemoryAssessmentStore::new(),
            conflicts: AtomicUsize::new(conflicts),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AssessmentStore for ConflictingStore {
    async fn get(&self, name: &str) -> Result<Option<Assessment>, StoreError> {
        self.inner.get(name).await
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        self.inner.list().await
    }

    async fn update_status(&self, assessment: &Assessment) -> Result<Assessment, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict {
                name: assessment.name.clone(),
            });
        }
        self.inner.update_status(assessment).await
    }
}

/// Forwards names sent through [`ForwardingWatch::channel`] as change events.
pub struct ForwardingWatch {
    names: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl ForwardingWatch {
    pub fn channel() -> (mpsc::UnboundedSender<String>, Arc<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watch = Arc::new(Self {
            names: Mutex::new(Some(rx)),
        });
        (tx, watch)
    }
}

#[async_trait]
impl AssessmentWatch for ForwardingWatch {
    async fn watch(
        &self,
        cancel: &CancelToken,
        changes: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<()> {
        let Some(mut names) = self.names.lock().unwrap().take() else {
            return Err(anyhow!("watch already started"));
        };
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                name = names.recv() => match name {
                    Some(name) => {
                        if changes.send(name).is_err() {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                },
            }
        }
    }
}
