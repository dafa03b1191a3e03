//! Findings emitted by validators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of a single check.
///
/// Variants are declared in severity order so the derived `Ord` matches
/// [`FindingStatus::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingStatus {
    Info,
    Pass,
    Warn,
    Fail,
}

impl FindingStatus {
    pub const ALL: [FindingStatus; 4] = [
        FindingStatus::Info,
        FindingStatus::Pass,
        FindingStatus::Warn,
        FindingStatus::Fail,
    ];

    /// Severity rank used by the severity filter: INFO(0) < PASS(1) < WARN(2) < FAIL(3).
    pub fn rank(self) -> u8 {
        match self {
            FindingStatus::Info => 0,
            FindingStatus::Pass => 1,
            FindingStatus::Warn => 2,
            FindingStatus::Fail => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FindingStatus::Info => "INFO",
            FindingStatus::Pass => "PASS",
            FindingStatus::Warn => "WARN",
            FindingStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingStatus {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        FindingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| anyhow::anyhow!("unknown finding status: {raw:?}"))
    }
}

/// One observation reported by exactly one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub validator: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub status: FindingStatus,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Finding {
    pub fn new(
        id: impl Into<String>,
        validator: impl Into<String>,
        category: impl Into<String>,
        status: FindingStatus,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            validator: validator.into(),
            category: category.into(),
            resource: None,
            namespace: None,
            status,
            title: title.into(),
            description: String::new(),
            impact: None,
            recommendation: String::new(),
            references: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_resource(mut self, namespace: Option<&str>, resource: impl Into<String>) -> Self {
        self.namespace = namespace.map(str::to_string);
        self.resource = Some(resource.into());
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!("warn".parse::<FindingStatus>().unwrap(), FindingStatus::Warn);
        assert_eq!(" FAIL ".parse::<FindingStatus>().unwrap(), FindingStatus::Fail);
        assert!("CRITICAL".parse::<FindingStatus>().is_err());
    }

    #[test]
    fn serializes_status_in_upper_case() {
        let finding = Finding::new("nodes-count", "nodes", "Infrastructure", FindingStatus::Pass, "ok");
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["status"], "PASS");
        assert!(value.get("impact").is_none());
    }

    #[test]
    fn ordering_follows_rank() {
        let mut statuses = vec![FindingStatus::Fail, FindingStatus::Info, FindingStatus::Warn, FindingStatus::Pass];
        statuses.sort();
        assert_eq!(statuses, FindingStatus::ALL.to_vec());
    }
}
