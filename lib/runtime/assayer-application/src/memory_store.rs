use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use assayer_domain::Assessment;
use assayer_ports::{AssessmentStore, StoreError};

/// Process-local assessment store with the same optimistic-concurrency
/// contract as the cluster-backed one. Versions are a monotonically
/// increasing counter shared by all records.
#[derive(Debug, Default)]
pub struct InMemoryAssessmentStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    assessments: BTreeMap<String, Assessment>,
    version: u64,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

impl InMemoryAssessmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the whole record, ignoring any version it carries.
    pub fn apply(&self, mut assessment: Assessment) -> Assessment {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        assessment.resource_version = Some(inner.next_version());
        inner
            .assessments
            .insert(assessment.name.clone(), assessment.clone());
        assessment
    }

    pub fn remove(&self, name: &str) -> Option<Assessment> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .assessments
            .remove(name)
    }

    pub fn snapshot(&self, name: &str) -> Option<Assessment> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .assessments
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl AssessmentStore for InMemoryAssessmentStore {
    async fn get(&self, name: &str) -> Result<Option<Assessment>, StoreError> {
        Ok(self.snapshot(name))
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.assessments.values().cloned().collect())
    }

    async fn update_status(&self, assessment: &Assessment) -> Result<Assessment, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let version = inner.next_version();
        let Some(stored) = inner.assessments.get_mut(&assessment.name) else {
            return Err(StoreError::NotFound {
                name: assessment.name.clone(),
            });
        };
        if stored.resource_version != assessment.resource_version {
            return Err(StoreError::Conflict {
                name: assessment.name.clone(),
            });
        }
        stored.status = assessment.status.clone();
        stored.resource_version = Some(version);
        Ok(stored.clone())
    }
}
