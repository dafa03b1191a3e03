//! The Assessment record: desired configuration and observed outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finding::Finding;

pub const CONDITION_READY: &str = "Ready";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_finished(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn default_formats() -> Vec<ReportFormat> {
    vec![ReportFormat::Json]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStorageSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Artifact base name; the assessment name is used when empty.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportStorageSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            name: String::new(),
            formats: default_formats(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSpec {
    /// Cron expression; empty means a one-time assessment.
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub profile: String,
    /// Explicit validator subset; empty means every registered validator.
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub suspend: bool,
    #[serde(default)]
    pub min_severity: String,
    #[serde(default)]
    pub report_storage: ReportStorageSpec,
}

impl AssessmentSpec {
    pub fn is_scheduled(&self) -> bool {
        !self.schedule.trim().is_empty()
    }
}

/// Best-effort snapshot of cluster metadata taken at run time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    #[serde(default)]
    pub kubernetes_version: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default)]
    pub namespace_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    pub total_checks: u32,
    pub pass_count: u32,
    pub warn_count: u32,
    pub fail_count: u32,
    pub info_count: u32,
    /// Absent when no checks were counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub profile_used: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn ready(ready: bool, reason: &str, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            type_: CONDITION_READY.to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_info: Option<ClusterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AssessmentSummary>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl AssessmentStatus {
    /// Replaces the condition of the same type. The transition time is kept
    /// when the condition status did not change.
    pub fn set_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|existing| existing.type_ == condition.type_)
        {
            Some(existing) => {
                let last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time
                } else {
                    condition.last_transition_time
                };
                *existing = Condition {
                    last_transition_time,
                    ..condition
                };
            }
            None => self.conditions.push(condition),
        }
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub name: String,
    /// Opaque optimistic-concurrency token owned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default)]
    pub spec: AssessmentSpec,
    #[serde(default)]
    pub status: AssessmentStatus,
}

impl Assessment {
    pub fn new(name: impl Into<String>, spec: AssessmentSpec) -> Self {
        Self {
            name: name.into(),
            resource_version: None,
            spec,
            status: AssessmentStatus::default(),
        }
    }

    /// Base name for stored report artifacts.
    pub fn report_name(&self) -> &str {
        let configured = self.spec.report_storage.name.trim();
        if configured.is_empty() {
            &self.name
        } else {
            configured
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deserializes_minimal_manifest() {
        let raw = r#"
name: weekly
spec:
  schedule: "0 2 * * 0"
  profile: production
  reportStorage:
    enabled: true
"#;
        let assessment: Assessment = serde_yaml::from_str(raw).unwrap();
        assert!(assessment.spec.is_scheduled());
        assert_eq!(assessment.status.phase, Phase::Pending);
        assert_eq!(assessment.spec.report_storage.formats, vec![ReportFormat::Json]);
        assert_eq!(assessment.report_name(), "weekly");
    }

    #[test]
    fn set_condition_keeps_transition_time_when_status_is_unchanged() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut status = AssessmentStatus::default();
        status.set_condition(Condition::ready(true, "Completed", "first", first));
        status.set_condition(Condition::ready(true, "Completed", "second", later));
        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.last_transition_time, first);
        assert_eq!(ready.message, "second");

        status.set_condition(Condition::ready(false, "Failed", "third", later));
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].last_transition_time, later);
    }
}
