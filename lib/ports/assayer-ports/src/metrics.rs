use std::time::Duration;

use chrono::{DateTime, Utc};

use assayer_domain::{AssessmentSummary, ClusterInfo};

#[derive(Debug, Clone, Copy)]
pub struct AssessmentMetrics<'a> {
    pub assessment: &'a str,
    pub profile: &'a str,
    pub summary: &'a AssessmentSummary,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidatorMetrics<'a> {
    pub assessment: &'a str,
    pub validator: &'a str,
    pub findings: usize,
    pub errored: bool,
    pub duration: Duration,
}

/// Fire-and-forget metrics recording. Implementations must not block and
/// have no way to fail the caller.
pub trait MetricsSink: Send + Sync {
    fn record_assessment(&self, metrics: &AssessmentMetrics<'_>);

    fn record_cluster_info(&self, assessment: &str, info: &ClusterInfo);

    fn record_validator(&self, metrics: &ValidatorMetrics<'_>);
}
