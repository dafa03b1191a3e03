use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use assayer_domain::Assessment;

use crate::cancel::CancelToken;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("assessment {name:?} not found")]
    NotFound { name: String },
    #[error("assessment {name:?} was modified concurrently")]
    Conflict { name: String },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Persistence for assessments. Status writes are optimistic: the
/// `resource_version` carried by the submitted assessment must match the
/// stored one.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Assessment>, StoreError>;

    async fn list(&self) -> Result<Vec<Assessment>, StoreError>;

    /// Writes `assessment.status` and returns the stored copy with its new
    /// `resource_version`. Fails with [`StoreError::Conflict`] when the
    /// submitted version is stale.
    async fn update_status(&self, assessment: &Assessment) -> Result<Assessment, StoreError>;
}

/// Change notifications for stored assessments.
#[async_trait]
pub trait AssessmentWatch: Send + Sync {
    /// Sends the name of every created, modified or deleted assessment to
    /// `changes` until `cancel` fires or the receiver is dropped.
    async fn watch(
        &self,
        cancel: &CancelToken,
        changes: UnboundedSender<String>,
    ) -> anyhow::Result<()>;
}
