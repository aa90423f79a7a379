//! Postgres job store tests.
//!
//! Need Docker for the shared Postgres container:
//! `cargo test --test pg_store_tests -- --ignored`

mod common;

use std::sync::Arc;

use crate::common::postgres_pool;
use title_doctor::common::{JobId, StoreError};
use title_doctor::domains::jobs::{
    Job, JobPatch, JobStatus, JobStore, MergeOutcome, PostgresJobStore, Revision,
};

async fn store() -> PostgresJobStore {
    PostgresJobStore::new(postgres_pool().await.unwrap())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn create_then_load_round_trips_the_document() {
    let store = store().await;
    let job = Job::new("Acme", "user@example.com");

    store.create(&job).await.unwrap();
    let (loaded, revision) = store.load(job.id).await.unwrap().unwrap();

    assert_eq!(loaded, job);
    assert_eq!(revision, Revision::INITIAL);
    assert!(store.load(JobId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_create_is_rejected() {
    let store = store().await;
    let job = Job::new("Acme", "user@example.com");

    store.create(&job).await.unwrap();
    let err = store.create(&job).await.unwrap_err();

    assert!(matches!(err, StoreError::AlreadyExists(id) if id == job.id));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn save_checks_the_revision() {
    let store = store().await;
    let job = Job::new("Acme", "user@example.com");
    store.create(&job).await.unwrap();

    let next = store.save(&job, Revision::INITIAL).await.unwrap();
    assert_eq!(next, Revision::INITIAL.next());

    let err = store.save(&job, Revision::INITIAL).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let missing = Job::new("Other", "user@example.com");
    let err = store.save(&missing, Revision::INITIAL).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn merge_keeps_terminal_jobs_terminal() {
    let store = store().await;
    let job = Job::new("Acme", "user@example.com");
    store.create(&job).await.unwrap();

    store
        .merge(job.id, JobPatch::failed("No channel found"))
        .await
        .unwrap();
    let outcome = store
        .merge(job.id, JobPatch::status(JobStatus::Listing))
        .await
        .unwrap();

    assert!(matches!(outcome, MergeOutcome::Terminal(_)));
    let stored = store.get(job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("No channel found"));
}

/// Concurrent writers on one job all land through the merge retry loop.
#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_merges_do_not_lose_writes() {
    let store = Arc::new(store().await);
    let job = Job::new("Acme", "user@example.com");
    store.create(&job).await.unwrap();

    let status = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .merge(job.id, JobPatch::status(JobStatus::Listing))
                .await
        })
    };
    let resolved = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .merge(job.id, JobPatch::default().resolved("C123", "Acme Channel"))
                .await
        })
    };
    status.await.unwrap().unwrap();
    resolved.await.unwrap().unwrap();

    let stored = store.get(job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Listing);
    assert_eq!(stored.resolved_id.as_deref(), Some("C123"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn ping_and_backend() {
    let store = store().await;
    store.ping().await.unwrap();
    assert_eq!(store.backend(), "postgres");
}
