use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use assayer_domain::{ObjectKey, Profile, Resource, ResourceKind};
use assayer_ports::{CancelToken, ClusterError, ClusterReader, ValidationContext};

/// Serves fixed objects per kind.
#[derive(Default)]
pub struct StaticReader {
    objects: HashMap<String, Vec<Resource>>,
}

impl StaticReader {
    pub fn with(mut self, kind: ResourceKind, objects: Vec<Value>) -> Self {
        self.objects
            .entry(kind.kind)
            .or_default()
            .extend(objects.into_iter().map(Resource::new));
        self
    }

    pub fn context(self, profile: Profile) -> ValidationContext {
        ValidationContext {
            cancel: CancelToken::new(),
            reader: Arc::new(self),
            profile,
        }
    }
}

#[async_trait]
impl ClusterReader for StaticReader {
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
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError> {
        cancel.check()?;
        Ok(self
            .objects
            .get(&kind.kind)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| namespace.is_none() || o.namespace() == namespace)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub struct UnreachableReader;

#[async_trait]
impl ClusterReader for UnreachableReader {
    async fn get(
        &self,
        _cancel: &CancelToken,
        _kind: &ResourceKind,
        _key: &ObjectKey,
    ) -> Result<Option<Resource>, ClusterError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn list(
        &self,
        _cancel: &CancelToken,
        _kind: &ResourceKind,
        _namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError> {
        Err(anyhow::anyhow!("connection refused").into())
    }
}

pub fn node(name: &str, control_plane: bool, ready: bool) -> Value {
    let mut labels = serde_json::Map::new();
    if control_plane {
        labels.insert(
            "node-role.kubernetes.io/control-plane".to_string(),
            json!(""),
        );
    }
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {"name": name, "labels": labels},
        "status": {
            "conditions": [
                {"type": "Ready", "status": if ready { "True" } else { "False" }}
            ]
        }
    })
}

pub fn namespace(name: &str) -> Value {
    json!({"metadata": {"name": name}})
}

pub fn network_policy(namespace: &str, name: &str) -> Value {
    json!({"metadata": {"name": name, "namespace": namespace}, "spec": {"podSelector": {}}})
}

pub fn cluster_admin_binding(name: &str, subject: &str) -> Value {
    json!({
        "metadata": {"name": name},
        "roleRef": {"apiGroup": "rbac.authorization.k8s.io", "kind": "ClusterRole", "name": "cluster-admin"},
        "subjects": [{"kind": "User", "name": subject}]
    })
}
