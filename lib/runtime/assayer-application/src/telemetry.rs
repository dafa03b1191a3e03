use tracing::info;

use assayer_domain::ClusterInfo;
use assayer_ports::{AssessmentMetrics, MetricsSink, ValidatorMetrics};

/// Metrics sink that emits one structured log event per sample under the
/// `assayer::metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn record_assessment(&self, metrics: &AssessmentMetrics<'_>) {
        let summary = metrics.summary;
        info!(
            target: "assayer::metrics",
            assessment = metrics.assessment,
            profile = metrics.profile,
            score = ?summary.score,
            total = summary.total_checks,
            pass = summary.pass_count,
            warn = summary.warn_count,
            fail = summary.fail_count,
            info = summary.info_count,
            duration_ms = metrics.duration.as_millis() as u64,
            timestamp = %metrics.timestamp.to_rfc3339(),
            "assessment"
        );
    }

    fn record_cluster_info(&self, assessment: &str, info: &ClusterInfo) {
        info!(
            target: "assayer::metrics",
            assessment,
            kubernetes_version = %info.kubernetes_version,
            platform = %info.platform,
            nodes = info.node_count,
            namespaces = info.namespace_count,
            "cluster_info"
        );
    }

    fn record_validator(&self, metrics: &ValidatorMetrics<'_>) {
        info!(
            target: "assayer::metrics",
            assessment = metrics.assessment,
            validator = metrics.validator,
            findings = metrics.findings,
            errored = metrics.errored,
            duration_ms = metrics.duration.as_millis() as u64,
            "validator"
        );
    }
}
