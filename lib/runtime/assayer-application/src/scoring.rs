//! Severity filtering and health scoring.

use std::cmp::Ordering;

use assayer_domain::{AssessmentSummary, Finding, FindingStatus};

const PASS_WEIGHT: u64 = 100;
const INFO_WEIGHT: u64 = 80;
const WARN_WEIGHT: u64 = 50;
const FAIL_WEIGHT: u64 = 0;

/// Parses a `minSeverity` value. Empty and unknown values yield `None`.
pub fn parse_min_severity(raw: &str) -> Option<FindingStatus> {
    raw.parse().ok()
}

/// Keeps findings whose status ranks at or above `min_severity`, preserving
/// order. An empty or unrecognised threshold keeps everything.
pub fn filter_by_severity(findings: Vec<Finding>, min_severity: &str) -> Vec<Finding> {
    let Some(threshold) = parse_min_severity(min_severity) else {
        return findings;
    };
    findings
        .into_iter()
        .filter(|finding| finding.status.rank() >= threshold.rank())
        .collect()
}

/// Counts statuses and computes
/// `floor((100·pass + 80·info + 50·warn + 0·fail) / total)`.
/// The score is absent when there are no findings.
pub fn calculate_summary(findings: &[Finding], profile: &str) -> AssessmentSummary {
    let mut summary = AssessmentSummary {
        profile_used: profile.to_string(),
        ..AssessmentSummary::default()
    };

    for finding in findings {
        match finding.status {
            FindingStatus::Pass => summary.pass_count += 1,
            FindingStatus::Warn => summary.warn_count += 1,
            FindingStatus::Fail => summary.fail_count += 1,
            FindingStatus::Info => summary.info_count += 1,
        }
    }
    summary.total_checks =
        summary.pass_count + summary.warn_count + summary.fail_count + summary.info_count;

    if summary.total_checks > 0 {
        let weighted = PASS_WEIGHT * u64::from(summary.pass_count)
            + INFO_WEIGHT * u64::from(summary.info_count)
            + WARN_WEIGHT * u64::from(summary.warn_count)
            + FAIL_WEIGHT * u64::from(summary.fail_count);
        let score = weighted / u64::from(summary.total_checks);
        summary.score = Some(u32::try_from(score).unwrap_or(100));
    }
    summary
}

/// Stable `(category, id)` order for report output.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| match a.category.cmp(&b.category) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
}
