use async_trait::async_trait;
use thiserror::Error;

use assayer_domain::{ClusterInfo, ObjectKey, Resource, ResourceKind};

use crate::cancel::{CancelToken, Cancelled};

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("{kind} requires a namespace to address {name:?}")]
    NamespaceRequired { kind: String, name: String },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read-only access to cluster objects. Implementations must only issue
/// get/list verbs.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn get(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        key: &ObjectKey,
    ) -> Result<Option<Resource>, ClusterError>;

    /// Lists objects of `kind`, across all namespaces when `namespace` is `None`.
    async fn list(
        &self,
        cancel: &CancelToken,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, ClusterError>;
}

/// Best-effort cluster metadata collection.
#[async_trait]
pub trait ClusterInspector: Send + Sync {
    async fn cluster_info(&self, cancel: &CancelToken) -> anyhow::Result<ClusterInfo>;
}
