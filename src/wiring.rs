use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use assayer_adapter_kube::{
    KubeAssessmentStore, KubeAssessmentWatch, KubeClusterInspector, KubeClusterReader,
};
use kube::Client;
use assayer_adapter_report::{FileReportStore, JsonReportAssembler};
use assayer_application::{
    Controller, ControllerSettings, InMemoryAssessmentStore, LogMetricsSink, Reconciler, ReconcilerSettings,
    Registry,
};
use assayer_domain::{AssayerConfig, Assessment, AssessmentSpec, ReportFormat, ReportStorageSpec};
use assayer_ports::{AssessmentStore, CancelToken, PortSet};

/// Registry holding every validator linked into the binary.
pub fn build_registry() -> Result<Arc<Registry>> {
    let registry = Registry::from_registrations().context("failed to register validators")?;
    debug!(
        builtin = assayer_checks::builtin().len(),
        validators = ?registry.names(),
        "validator registry ready"
    );
    Ok(Arc::new(registry))
}

pub fn reconciler_settings(config: &AssayerConfig) -> ReconcilerSettings {
    ReconcilerSettings {
        status_retries: config.controller.status_retries,
        default_profile: config.defaults.profile.clone(),
    }
}

pub fn controller_settings(config: &AssayerConfig) -> ControllerSettings {
    ControllerSettings {
        error_backoff_base: Duration::from_secs(config.controller.error_backoff_base_secs),
        error_backoff_max: Duration::from_secs(config.controller.error_backoff_max_secs),
        resync: Duration::from_secs(config.controller.resync_secs),
    }
}

/// Ports that do not need a cluster: JSON reports on disk and log metrics.
pub fn local_ports(config: &AssayerConfig) -> PortSet {
    PortSet::empty()
        .with_assembler(Arc::new(JsonReportAssembler))
        .with_reports(Arc::new(FileReportStore::new(&config.reports.directory)))
        .with_metrics(Arc::new(LogMetricsSink))
}

/// Connects to the configured cluster and returns the full port set, with
/// `Assessment` resources as the store.
pub async fn cluster_ports(config: &AssayerConfig) -> Result<PortSet> {
    let client = assayer_adapter_kube::connect(config.kube.context.as_deref()).await?;
    Ok(ports_for(config, client))
}

fn ports_for(config: &AssayerConfig, client: Client) -> PortSet {
    let store: Arc<dyn AssessmentStore> = Arc::new(KubeAssessmentStore::new(client.clone()));
    local_ports(config)
        .with_reader(Arc::new(KubeClusterReader::new(client.clone())))
        .with_inspector(Arc::new(KubeClusterInspector::new(client)))
        .with_store(store)
}

/// Controller over the cluster's `Assessment` resources, driven by a watch
/// on them plus the periodic resync.
pub async fn cluster_controller(
    config: &AssayerConfig,
    registry: Arc<Registry>,
) -> Result<Controller> {
    let client = assayer_adapter_kube::connect(config.kube.context.as_deref()).await?;
    let ports = ports_for(config, client.clone());
    let store = Arc::clone(&ports.store);
    let reconciler = Arc::new(Reconciler::new(ports, registry, reconciler_settings(config)));
    Ok(
        Controller::new(reconciler, store, controller_settings(config))
            .with_watch(Arc::new(KubeAssessmentWatch::new(client))),
    )
}

/// Parameters of a one-shot audit.
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    pub name: String,
    pub profile: String,
    pub validators: Vec<String>,
    pub min_severity: String,
    pub reports: Vec<ReportFormat>,
}

impl AuditRequest {
    fn into_assessment(self) -> Assessment {
        let spec = AssessmentSpec {
            schedule: String::new(),
            profile: self.profile,
            validators: self.validators,
            suspend: false,
            min_severity: self.min_severity,
            report_storage: ReportStorageSpec {
                enabled: !self.reports.is_empty(),
                name: String::new(),
                formats: self.reports,
            },
        };
        Assessment::new(self.name, spec)
    }
}

/// Runs one assessment to completion against a private in-memory store and
/// returns the final record. Whatever store `ports` carries is ignored.
pub async fn audit(
    ports: PortSet,
    registry: Arc<Registry>,
    settings: ReconcilerSettings,
    cancel: &CancelToken,
    request: AuditRequest,
) -> Result<Assessment> {
    let store = Arc::new(InMemoryAssessmentStore::new());
    let name = store.apply(request.into_assessment()).name;

    let reconciler = Reconciler::new(ports.with_store(store.clone()), registry, settings);
    info!(assessment = %name, "running on-demand audit");
    reconciler
        .reconcile_by_name(cancel, &name)
        .await
        .with_context(|| format!("audit {name:?} failed"))?;
    store
        .snapshot(&name)
        .with_context(|| format!("audit {name:?} left no record"))
}
