use std::sync::atomic::Ordering;

use assayer_domain::{Assessment, AssessmentSpec, Phase};
use assayer_ports::StoreError;

use crate::retry::{Mutation, UpdateOutcome, retry_on_conflict, update_status};
use crate::test_support::ConflictingStore;

fn seeded(conflicts: usize) -> ConflictingStore {
    let store = ConflictingStore::new(conflicts);
    store
        .inner
        .apply(Assessment::new("weekly", AssessmentSpec::default()));
    store
}

fn mark_running(assessment: &mut Assessment) -> Mutation {
    assessment.status.phase = Phase::Running;
    Mutation::Apply
}

#[tokio::test]
async fn conflicts_below_the_limit_are_retried() {
    let store = seeded(4);
    let outcome = update_status(&store, "weekly", 5, mark_running)
        .await
        .unwrap();

    let stored = match outcome {
        UpdateOutcome::Updated(stored) => stored,
        other => panic!("expected an update, got {other:?}"),
    };
    assert_eq!(stored.status.phase, Phase::Running);
    assert_eq!(store.writes.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn conflicts_at_the_limit_surface() {
    let store = seeded(5);
    let err = update_status(&store, "weekly", 5, mark_running)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(store.writes.load(Ordering::SeqCst), 5);
    let stored = store.inner.snapshot("weekly").unwrap();
    assert_eq!(stored.status.phase, Phase::Pending);
}

#[tokio::test]
async fn skipped_mutation_does_not_write() {
    let store = seeded(0);
    let outcome = update_status(&store, "weekly", 5, |_| Mutation::Skip)
        .await
        .unwrap();

    assert!(matches!(outcome, UpdateOutcome::Unchanged(_)));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_assessment_is_reported() {
    let store = seeded(0);
    let outcome = update_status(&store, "absent", 5, mark_running)
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Missing);
}

#[tokio::test]
async fn non_conflict_errors_are_not_retried() {
    let mut attempts = 0;
    let result: Result<(), StoreError> = retry_on_conflict(5, || {
        attempts += 1;
        async { Err(StoreError::Backend(anyhow::anyhow!("connection reset"))) }
    })
    .await;

    assert!(matches!(result, Err(StoreError::Backend(_))));
    assert_eq!(attempts, 1);
}
