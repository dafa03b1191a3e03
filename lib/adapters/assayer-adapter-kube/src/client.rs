use anyhow::{Context, Result};
use kube::Client;
use kube::config::{Config, KubeConfigOptions};
use tracing::info;

/// Builds a client for `context`, or from the inferred environment
/// (in-cluster service account, then the current kubeconfig context).
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..KubeConfigOptions::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("failed to load kubeconfig context {context:?}"))?
        }
        None => Config::infer()
            .await
            .context("failed to infer Kubernetes client configuration")?,
    };
    info!(cluster_url = %config.cluster_url, "connecting to Kubernetes API");
    Client::try_from(config).context("failed to build Kubernetes client")
}
