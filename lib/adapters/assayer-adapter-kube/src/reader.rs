use anyhow::Context;
use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::core::GroupVersionKind;

use assayer_domain::{ObjectKey, Resource, ResourceKind};
use assayer_ports::{CancelToken, ClusterError, ClusterReader};

const PAGE_SIZE: u32 = 500;

/// Dynamic, read-only cluster access. Only `get` and `list` are issued.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, kind: &ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&kind.group, &kind.version, &kind.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &kind.plural);
        match namespace {
            Some(namespace) if kind.namespaced => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn to_resource(object: DynamicObject) -> Result<Resource, ClusterError> {
    let value = serde_json::to_value(object).context("failed to encode cluster object")?;
    Ok(Resource::new(value))
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        key: &ObjectKey,
    ) -> Result<Option<Resource>, ClusterError> {
        cancel.check()?;
        if kind.namespaced && key.namespace.is_none() {
            return Err(ClusterError::NamespaceRequired {
                kind: kind.to_string(),
                name: key.name.clone(),
            });
        }
        let object = self
            .api(kind, key.namespace.as_deref())
            .get_opt(&key.name)
            .await
            .with_context(|| format!("failed to get {kind} {key}"))?;
        object.map(to_resource).transpose()
    }

    async fn list(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError> {
        let api = self.api(kind, namespace);
        let mut resources = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            cancel.check()?;
            let mut params = ListParams::default().limit(PAGE_SIZE);
            if let Some(token) = continue_token.as_deref() {
                params = params.continue_token(token);
            }
            let page = api
                .list(&params)
                .await
                .with_context(|| format!("failed to list {kind}"))?;
            continue_token = page.metadata.continue_.clone().filter(|token| !token.is_empty());
            for object in page.items {
                resources.push(to_resource(object)?);
            }
            if continue_token.is_none() {
                break;
            }
        }
        tracing::debug!(%kind, count = resources.len(), "listed resources");
        Ok(resources)
    }
}
