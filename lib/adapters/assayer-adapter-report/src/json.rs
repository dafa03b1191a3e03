use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use assayer_domain::{AssessmentSummary, ClusterInfo, Finding, ReportFormat};
use assayer_ports::{ReportArtifact, ReportAssembler, ReportInput};

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    assessment: &'a str,
    generated_at: DateTime<Utc>,
    cluster_info: &'a ClusterInfo,
    summary: &'a AssessmentSummary,
    findings: &'a [Finding],
}

/// Pretty-printed JSON document holding the summary, cluster metadata and
/// every finding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAssembler;

impl ReportAssembler for JsonReportAssembler {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn build(&self, input: &ReportInput<'_>) -> Result<ReportArtifact> {
        let report = JsonReport {
            assessment: input.assessment,
            generated_at: input.generated_at,
            cluster_info: input.cluster_info,
            summary: input.summary,
            findings: input.findings,
        };
        let body = serde_json::to_vec_pretty(&report)
            .with_context(|| format!("failed to encode report for {}", input.assessment))?;
        Ok(ReportArtifact {
            name: input.name.to_string(),
            format: ReportFormat::Json,
            content_type: CONTENT_TYPE_JSON,
            body,
        })
    }
}
