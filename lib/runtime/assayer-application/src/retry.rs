//! Optimistic-concurrency retry for status writes.

use std::future::Future;

use tracing::debug;

use assayer_domain::Assessment;
use assayer_ports::{AssessmentStore, StoreError};

pub const DEFAULT_STATUS_RETRIES: u32 = 5;

/// Errors that signal a lost compare-and-update race.
pub trait ConflictError {
    fn is_conflict(&self) -> bool;
}

impl ConflictError for StoreError {
    fn is_conflict(&self) -> bool {
        StoreError::is_conflict(self)
    }
}

/// Runs `op` until it succeeds, fails with a non-conflict error, or has been
/// attempted `attempts` times. The last conflict is returned on exhaustion.
/// Each attempt must redo the whole read-modify-write sequence.
pub async fn retry_on_conflict<T, E, F, Fut>(attempts: u32, mut op: F) -> Result<T, E>
where
    E: ConflictError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_conflict() && attempt < attempts => {
                debug!(attempt, attempts, "conflict on write, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// What a status mutation decided after seeing the latest stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Apply,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Assessment),
    /// The mutation declined to write; carries the copy it inspected.
    Unchanged(Assessment),
    /// The assessment no longer exists.
    Missing,
}

/// Re-fetches `name`, applies `mutate` to the fresh copy and writes the
/// status back, retrying the whole sequence on conflict.
pub async fn update_status<F>(
    store: &dyn AssessmentStore,
    name: &str,
    attempts: u32,
    mutate: F,
) -> Result<UpdateOutcome, StoreError>
where
    F: Fn(&mut Assessment) -> Mutation + Sync,
{
    let mutate = &mutate;
    retry_on_conflict::<UpdateOutcome, StoreError, _, _>(attempts, || async move {
        let Some(mut assessment) = store.get(name).await? else {
            return Ok(UpdateOutcome::Missing);
        };
        match mutate(&mut assessment) {
            Mutation::Skip => Ok(UpdateOutcome::Unchanged(assessment)),
            Mutation::Apply => match store.update_status(&assessment).await {
                Ok(stored) => Ok(UpdateOutcome::Updated(stored)),
                Err(StoreError::NotFound { .. }) => Ok(UpdateOutcome::Missing),
                Err(err) => Err(err),
            },
        }
    })
    .await
}
