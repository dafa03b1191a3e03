//! Collaborator interfaces consumed by the assessment engine.

pub mod cancel;
pub mod cluster;
pub mod metrics;
pub mod report;
pub mod store;
pub mod validator;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use assayer_domain::{Assessment, ClusterInfo, ObjectKey, Resource, ResourceKind};

pub use cancel::{CancelToken, Cancelled};
pub use cluster::{ClusterError, ClusterInspector, ClusterReader};
pub use metrics::{AssessmentMetrics, MetricsSink, ValidatorMetrics};
pub use report::{ReportArtifact, ReportAssembler, ReportInput, ReportStore};
pub use store::{AssessmentStore, AssessmentWatch, StoreError};
pub use validator::{
    ValidationContext, Validator, ValidatorError, ValidatorRegistration, registrations,
};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The collaborators one reconciler works against.
#[derive(Clone)]
pub struct PortSet {
    pub reader: Arc<dyn ClusterReader>,
    pub inspector: Arc<dyn ClusterInspector>,
    pub store: Arc<dyn AssessmentStore>,
    pub assemblers: Vec<Arc<dyn ReportAssembler>>,
    pub reports: Arc<dyn ReportStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub clock: Arc<dyn Clock>,
}

impl PortSet {
    pub fn empty() -> Self {
        Self {
            reader: Arc::new(NullClusterReader),
            inspector: Arc::new(NullClusterInspector),
            store: Arc::new(NullAssessmentStore),
            assemblers: Vec::new(),
            reports: Arc::new(NullReportStore),
            metrics: Arc::new(NullMetricsSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn ClusterReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ClusterInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AssessmentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_assembler(mut self, assembler: Arc<dyn ReportAssembler>) -> Self {
        self.assemblers.push(assembler);
        self
    }

    pub fn with_reports(mut self, reports: Arc<dyn ReportStore>) -> Self {
        self.reports = reports;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Clone, Default)]
struct NullClusterReader;

#[async_trait]
impl ClusterReader for NullClusterReader {
    async fn get(
        &self,
        cancel: &CancelToken,
        _kind: &ResourceKind,
        _key: &ObjectKey,
    ) -> Result<Option<Resource>, ClusterError> {
        cancel.check()?;
        Ok(None)
    }

    async fn list(
        &self,
        cancel: &CancelToken,
        _kind: &ResourceKind,
        _namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError> {
        cancel.check()?;
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
struct NullClusterInspector;

#[async_trait]
impl ClusterInspector for NullClusterInspector {
    async fn cluster_info(&self, _cancel: &CancelToken) -> anyhow::Result<ClusterInfo> {
        Ok(ClusterInfo::default())
    }
}

#[derive(Clone, Default)]
struct NullAssessmentStore;

#[async_trait]
impl AssessmentStore for NullAssessmentStore {
    async fn get(&self, _name: &str) -> Result<Option<Assessment>, StoreError> {
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        Ok(Vec::new())
    }

    async fn update_status(&self, assessment: &Assessment) -> Result<Assessment, StoreError> {
        Err(StoreError::NotFound {
            name: assessment.name.clone(),
        })
    }
}

#[derive(Clone, Default)]
struct NullReportStore;

#[async_trait]
impl ReportStore for NullReportStore {
    async fn store(&self, _artifact: &ReportArtifact) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record_assessment(&self, _metrics: &AssessmentMetrics<'_>) {}

    fn record_cluster_info(&self, _assessment: &str, _info: &ClusterInfo) {}

    fn record_validator(&self, _metrics: &ValidatorMetrics<'_>) {}
}
