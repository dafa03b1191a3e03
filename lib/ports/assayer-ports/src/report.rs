use async_trait::async_trait;
use chrono::{DateTime, Utc};

use assayer_domain::{AssessmentSummary, ClusterInfo, Finding, ReportFormat};

/// Inputs handed to every assembler for one completed run.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Artifact base name.
    pub name: &'a str,
    pub assessment: &'a str,
    pub generated_at: DateTime<Utc>,
    pub findings: &'a [Finding],
    pub summary: &'a AssessmentSummary,
    pub cluster_info: &'a ClusterInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub name: String,
    pub format: ReportFormat,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ReportArtifact {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.extension())
    }
}

/// Encodes findings into one output format. Markup encoders must escape
/// every untrusted string and refuse non-http(s) link targets.
pub trait ReportAssembler: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn build(&self, input: &ReportInput<'_>) -> anyhow::Result<ReportArtifact>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn store(&self, artifact: &ReportArtifact) -> anyhow::Result<()>;
}
