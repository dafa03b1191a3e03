use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use tracing::debug;

use assayer_domain::{Finding, FindingStatus, Resource, ResourceKind};
use assayer_ports::{ValidationContext, Validator, ValidatorError, ValidatorRegistration};

pub const NAME: &str = "nodes";
const CATEGORY: &str = "availability";

const CONTROL_PLANE_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/control-plane",
    "node-role.kubernetes.io/master",
];

/// Node counts against the profile minimums, and node readiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodesValidator;

pub(crate) fn factory() -> Arc<dyn Validator> {
    Arc::new(NodesValidator)
}

inventory::submit! { ValidatorRegistration::new(factory) }

fn is_control_plane(node: &Resource) -> bool {
    CONTROL_PLANE_LABELS
        .iter()
        .any(|label| node.has_label(label))
}

fn is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|ready| ready.status == "True")
}

fn finding(id: &str, status: FindingStatus, title: impl Into<String>) -> Finding {
    Finding::new(id, NAME, CATEGORY, status, title)
}

#[async_trait]
impl Validator for NodesValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn category(&self) -> &str {
        CATEGORY
    }

    fn description(&self) -> &str {
        "Checks control-plane and worker node counts and node readiness"
    }

    async fn validate(&self, ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        let nodes = ctx
            .reader
            .list(&ctx.cancel, &ResourceKind::nodes(), None)
            .await?;
        let thresholds = &ctx.profile.thresholds;
        let control_plane = nodes.iter().filter(|node| is_control_plane(node)).count();
        let workers = nodes.len() - control_plane;
        debug!(control_plane, workers, "counted nodes");

        let mut findings = Vec::new();

        let min_control_plane = thresholds.min_control_plane_nodes as usize;
        findings.push(if control_plane == 0 {
            finding(
                "nodes-control-plane-count",
                FindingStatus::Info,
                "Control-plane nodes are not visible",
            )
            .with_description(
                "No node carries a control-plane role label. Managed offerings usually hide the control plane.",
            )
        } else if control_plane < min_control_plane {
            finding(
                "nodes-control-plane-count",
                FindingStatus::Warn,
                "Control plane is below the recommended size",
            )
            .with_description(format!(
                "Found {control_plane} control-plane node(s); profile {} expects at least {min_control_plane}.",
                ctx.profile.name
            ))
            .with_impact("Losing a control-plane node may make the API server unavailable.")
            .with_recommendation("Run an odd number of control-plane nodes, three or more for high availability.")
            .with_reference("https://kubernetes.io/docs/setup/production-environment/tools/kubeadm/ha-topology/")
        } else {
            finding(
                "nodes-control-plane-count",
                FindingStatus::Pass,
                "Control plane meets the recommended size",
            )
            .with_description(format!("Found {control_plane} control-plane node(s)."))
        });

        let min_workers = thresholds.min_worker_nodes as usize;
        findings.push(if workers < min_workers {
            let status = if workers == 0 {
                FindingStatus::Fail
            } else {
                FindingStatus::Warn
            };
            finding("nodes-worker-count", status, "Too few worker nodes")
                .with_description(format!(
                    "Found {workers} worker node(s); profile {} expects at least {min_workers}.",
                    ctx.profile.name
                ))
                .with_impact("Workloads cannot be rescheduled when a worker node fails.")
                .with_recommendation("Add worker nodes or enable cluster autoscaling.")
        } else {
            finding("nodes-worker-count", FindingStatus::Pass, "Worker node count is sufficient")
                .with_description(format!("Found {workers} worker node(s)."))
        });

        let mut not_ready = Vec::new();
        for resource in &nodes {
            ctx.cancel.check()?;
            let node: Node = resource
                .decode()
                .map_err(|err| ValidatorError::with_partial(findings.clone(), err))?;
            if !is_ready(&node) {
                not_ready.push(resource.name().to_string());
            }
        }
        findings.push(if not_ready.is_empty() {
            finding("nodes-ready", FindingStatus::Pass, "All nodes are Ready")
        } else {
            finding("nodes-ready", FindingStatus::Fail, "Nodes are not Ready")
                .with_description(format!("Not Ready: {}.", not_ready.join(", ")))
                .with_impact("Pods on these nodes may be evicted or unreachable.")
                .with_recommendation("Inspect kubelet logs and node conditions with `kubectl describe node`.")
        });

        Ok(findings)
    }
}
