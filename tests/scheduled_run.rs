use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use assayer::application::{InMemoryAssessmentStore, Reconciler, ReconcilerSettings};
use assayer::domain::{
    AssayerConfig, Assessment, AssessmentSpec, FindingStatus, ObjectKey, Phase, ReportFormat,
    Resource, ResourceKind,
};
use assayer::ports::{CancelToken, Clock, ClusterError, ClusterReader, PortSet};
use assayer::{AuditRequest, audit, build_registry, local_ports};

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Three control-plane nodes and two workers, one of them NotReady.
struct FakeCluster {
    objects: HashMap<String, Vec<Resource>>,
}

impl FakeCluster {
    fn new() -> Self {
        let nodes = vec![
            node("cp-1", true, true),
            node("cp-2", true, true),
            node("cp-3", true, true),
            node("worker-1", false, true),
            node("worker-2", false, false),
        ];
        let mut objects = HashMap::new();
        objects.insert(
            ResourceKind::nodes().kind,
            nodes.into_iter().map(Resource::new).collect(),
        );
        Self { objects }
    }
}

fn node(name: &str, control_plane: bool, ready: bool) -> Value {
    let labels = if control_plane {
        json!({"node-role.kubernetes.io/control-plane": ""})
    } else {
        json!({})
    };
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {"name": name, "labels": labels},
        "status": {"conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]}
    })
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn get(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        key: &ObjectKey,
    ) -> Result<Option<Resource>, ClusterError> {
        cancel.check()?;
        Ok(self
            .objects
            .get(&kind.kind)
            .and_then(|objects| objects.iter().find(|o| o.name() == key.name))
            .cloned())
    }

    async fn list(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        _namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError> {
        cancel.check()?;
        Ok(self.objects.get(&kind.kind).cloned().unwrap_or_default())
    }
}

fn nodes_only(schedule: &str) -> AssessmentSpec {
    AssessmentSpec {
        schedule: schedule.to_string(),
        profile: "production".to_string(),
        validators: vec!["nodes".to_string()],
        ..AssessmentSpec::default()
    }
}

#[tokio::test]
async fn weekly_assessment_runs_builtin_checks_on_schedule() {
    // Saturday evening; the schedule fires Sunday 02:00.
    let saturday = utc(2026, 10, 17, 22, 0);
    let sunday = utc(2026, 10, 18, 2, 0);
    let clock = Arc::new(TestClock(Mutex::new(saturday)));
    let store = Arc::new(InMemoryAssessmentStore::new());
    store.apply(Assessment::new("weekly", nodes_only("0 2 * * 0")));

    let ports = PortSet::empty()
        .with_reader(Arc::new(FakeCluster::new()))
        .with_store(store.clone())
        .with_clock(clock.clone());
    let reconciler = Reconciler::new(
        ports,
        build_registry().unwrap(),
        ReconcilerSettings::default(),
    );
    let cancel = CancelToken::new();

    // Never run before, so the first pass runs at once.
    let action = reconciler.reconcile_by_name(&cancel, "weekly").await.unwrap();
    assert_eq!(action.requeue_after(), Some(Duration::from_secs(4 * 3600)));

    let stored = store.snapshot("weekly").unwrap();
    assert_eq!(stored.status.phase, Phase::Completed);
    assert_eq!(stored.status.last_run_time, Some(saturday));
    assert_eq!(stored.status.next_run_time, Some(sunday));
    let ids: Vec<_> = stored
        .status
        .findings
        .iter()
        .map(|finding| (finding.id.as_str(), finding.status))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("nodes-control-plane-count", FindingStatus::Pass),
            ("nodes-ready", FindingStatus::Fail),
            ("nodes-worker-count", FindingStatus::Pass),
        ]
    );
    let summary = stored.status.summary.unwrap();
    assert_eq!(summary.score, Some(66));
    assert_eq!(summary.profile_used, "production");

    clock.set(utc(2026, 10, 18, 1, 0));
    let action = reconciler.reconcile_by_name(&cancel, "weekly").await.unwrap();
    assert_eq!(action.requeue_after(), Some(Duration::from_secs(3600)));
    assert_eq!(
        store.snapshot("weekly").unwrap().status.last_run_time,
        Some(saturday)
    );

    clock.set(sunday);
    let action = reconciler.reconcile_by_name(&cancel, "weekly").await.unwrap();
    assert_eq!(action.requeue_after(), Some(Duration::from_secs(7 * 24 * 3600)));
    let stored = store.snapshot("weekly").unwrap();
    assert_eq!(stored.status.last_run_time, Some(sunday));
    assert_eq!(stored.status.next_run_time, Some(utc(2026, 10, 25, 2, 0)));
}

#[tokio::test]
async fn audit_writes_json_report_and_skips_unsupported_formats() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AssayerConfig::default();
    config.reports.directory = dir.path().to_path_buf();

    let ports = local_ports(&config).with_reader(Arc::new(FakeCluster::new()));
    let request = AuditRequest {
        name: "nightly".to_string(),
        profile: "development".to_string(),
        validators: vec!["nodes".to_string()],
        min_severity: "fail".to_string(),
        reports: vec![ReportFormat::Json, ReportFormat::Html],
    };
    let assessment = audit(
        ports,
        build_registry().unwrap(),
        ReconcilerSettings::default(),
        &CancelToken::new(),
        request,
    )
    .await
    .unwrap();

    assert_eq!(assessment.status.phase, Phase::Completed);
    assert_eq!(assessment.status.findings.len(), 1);
    assert_eq!(assessment.status.findings[0].id, "nodes-ready");
    assert_eq!(assessment.status.summary.as_ref().unwrap().score, Some(0));

    let raw = std::fs::read_to_string(dir.path().join("nightly.json")).unwrap();
    let report: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(report["assessment"], "nightly");
    assert_eq!(report["findings"].as_array().unwrap().len(), 1);
    assert!(!dir.path().join("nightly.html").exists());
}

#[test]
fn builtin_validators_are_registered() {
    let registry = build_registry().unwrap();
    assert_eq!(
        registry.names(),
        vec!["network-policies", "nodes", "rbac-cluster-admin"]
    );
}
