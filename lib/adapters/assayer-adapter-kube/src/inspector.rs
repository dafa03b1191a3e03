use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node};
use kube::Client;
use kube::api::{Api, ListParams};
use tracing::warn;

use assayer_domain::ClusterInfo;
use assayer_ports::{CancelToken, ClusterInspector};

/// Collects version, platform and object counts. Each probe is independent;
/// a failed probe leaves its fields empty.
#[derive(Clone)]
pub struct KubeClusterInspector {
    client: Client,
}

impl KubeClusterInspector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Guesses the distribution from the API server's git version string.
pub fn detect_platform(git_version: &str) -> &'static str {
    let version = git_version.to_ascii_lowercase();
    if version.contains("-eks-") {
        "eks"
    } else if version.contains("-gke.") {
        "gke"
    } else if version.contains("+k3s") {
        "k3s"
    } else if version.contains("+rke2") {
        "rke2"
    } else if version.contains("-aks") || version.contains("+aks") {
        "aks"
    } else if version.contains("+openshift") || version.contains("+ocp") {
        "openshift"
    } else if version.is_empty() {
        ""
    } else {
        "kubernetes"
    }
}

#[async_trait]
impl ClusterInspector for KubeClusterInspector {
    async fn cluster_info(&self, cancel: &CancelToken) -> Result<ClusterInfo> {
        cancel.check()?;
        let mut info = ClusterInfo::default();
        match self.client.apiserver_version().await {
            Ok(version) => {
                info.platform = detect_platform(&version.git_version).to_string();
                info.kubernetes_version = version.git_version;
            }
            Err(err) => warn!(error = %err, "failed to read API server version"),
        }

        cancel.check()?;
        let nodes: Api<Node> = Api::all(self.client.clone());
        match nodes.list_metadata(&ListParams::default()).await {
            Ok(list) => info.node_count = saturating_count(list.items.len()),
            Err(err) => warn!(error = %err, "failed to count nodes"),
        }

        cancel.check()?;
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        match namespaces.list_metadata(&ListParams::default()).await {
            Ok(list) => info.namespace_count = saturating_count(list.items.len()),
            Err(err) => warn!(error = %err, "failed to count namespaces"),
        }
        Ok(info)
    }
}
