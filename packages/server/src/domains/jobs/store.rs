//! Job persistence.
//!
//! Backends only implement three primitives: `create`, `load` and a
//! compare-and-swap `save` guarded by a [`Revision`]. `merge` is built on top
//! of them once, here, so every backend gets the same read-modify-write
//! behavior:
//!
//! 1. load the current record and its revision
//! 2. apply the patch in memory ([`Job::apply`])
//! 3. save with the revision observed in step 1
//! 4. on a revision conflict, start over from step 1
//!
//! Two concurrent merges to the same job therefore never lose each other's
//! writes; one of them simply retries against the other's result.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::models::job::{Job, JobPatch, MergeOutcome};
use crate::common::{JobId, StoreError};

/// Attempts `merge` makes before giving up with [`StoreError::Conflict`].
pub const MAX_MERGE_ATTEMPTS: u32 = 8;

/// Optimistic concurrency token. Advances on every successful save.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub i64);

impl Revision {
    /// Revision of a freshly created record.
    pub const INITIAL: Revision = Revision(1);

    pub fn next(self) -> Self {
        Revision(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    async fn load(&self, id: JobId) -> Result<Option<(Job, Revision)>, StoreError>;

    /// Replace the record if its revision still equals `expected`.
    ///
    /// Returns the new revision, `Conflict` if someone saved in between, or
    /// `NotFound` if the record does not exist.
    async fn save(&self, job: &Job, expected: Revision) -> Result<Revision, StoreError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Job, StoreError> {
        self.load(id)
            .await?
            .map(|(job, _)| job)
            .ok_or(StoreError::NotFound(id))
    }

    /// Atomically merge `patch` into the stored job.
    async fn merge(&self, id: JobId, patch: JobPatch) -> Result<MergeOutcome, StoreError> {
        for attempt in 1..=MAX_MERGE_ATTEMPTS {
            let (current, revision) = self.load(id).await?.ok_or(StoreError::NotFound(id))?;

            let job = match current.apply(&patch) {
                MergeOutcome::Applied(job) => job,
                other => return Ok(other),
            };

            match self.save(&job, revision).await {
                Ok(_) => return Ok(MergeOutcome::Applied(job)),
                Err(StoreError::Conflict { .. }) => {
                    debug!(job_id = %id, attempt, %revision, "merge lost a race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Conflict {
            job_id: id,
            attempts: MAX_MERGE_ATTEMPTS,
        })
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store for development and tests.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, (Job, Revision)>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(job.id)),
            Entry::Vacant(slot) => {
                slot.insert((job.clone(), Revision::INITIAL));
                Ok(())
            }
        }
    }

    async fn load(&self, id: JobId) -> Result<Option<(Job, Revision)>, StoreError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, job: &Job, expected: Revision) -> Result<Revision, StoreError> {
        let mut entry = self
            .jobs
            .get_mut(&job.id)
            .ok_or(StoreError::NotFound(job.id))?;

        let (stored, revision) = entry.value_mut();
        if *revision != expected {
            return Err(StoreError::Conflict {
                job_id: job.id,
                attempts: 1,
            });
        }

        *stored = job.clone();
        *revision = revision.next();
        Ok(*revision)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::jobs::models::job::JobStatus;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = InMemoryJobStore::new();
        let job = Job::new("Acme", "user@example.com");

        store.create(&job).await.unwrap();
        let err = store.create(&job).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == job.id));
    }

    #[tokio::test]
    async fn merge_on_unknown_job_is_not_found() {
        let store = InMemoryJobStore::new();
        let err = store
            .merge(JobId::new(), JobPatch::status(JobStatus::Resolving))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stale_revision_is_a_conflict() {
        let store = InMemoryJobStore::new();
        let job = Job::new("Acme", "user@example.com");
        store.create(&job).await.unwrap();

        let (loaded, rev) = store.load(job.id).await.unwrap().unwrap();
        store.save(&loaded, rev).await.unwrap();

        let err = store.save(&loaded, rev).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn unchanged_merge_does_not_bump_revision() {
        let store = InMemoryJobStore::new();
        let job = Job::new("Acme", "user@example.com");
        store.create(&job).await.unwrap();

        let outcome = store
            .merge(job.id, JobPatch::status(JobStatus::Queued))
            .await
            .unwrap();
        assert!(matches!(outcome, MergeOutcome::Unchanged(_)));

        let (_, rev) = store.load(job.id).await.unwrap().unwrap();
        assert_eq!(rev, Revision::INITIAL);
    }

    /// Lets another writer slip in between the first load and save.
    struct RacingStore {
        inner: InMemoryJobStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl JobStore for RacingStore {
        async fn create(&self, job: &Job) -> Result<(), StoreError> {
            self.inner.create(job).await
        }

        async fn load(&self, id: JobId) -> Result<Option<(Job, Revision)>, StoreError> {
            self.inner.load(id).await
        }

        async fn save(&self, job: &Job, expected: Revision) -> Result<Revision, StoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .merge(job.id, JobPatch::default().resolved("C123", "Acme Channel"))
                    .await?;
            }
            self.inner.save(job, expected).await
        }

        fn backend(&self) -> &'static str {
            "racing"
        }
    }

    #[tokio::test]
    async fn merge_retries_after_conflict_without_losing_writes() {
        let store = RacingStore {
            inner: InMemoryJobStore::new(),
            raced: AtomicBool::new(false),
        };
        let job = Job::new("Acme", "user@example.com");
        store.create(&job).await.unwrap();

        store
            .merge(job.id, JobPatch::status(JobStatus::Resolving))
            .await
            .unwrap();

        let stored = store.get(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Resolving);
        assert_eq!(stored.resolved_id.as_deref(), Some("C123"));
    }

    #[tokio::test]
    async fn concurrent_merges_all_land() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = Job::new("Acme", "user@example.com");
        store.create(&job).await.unwrap();

        let patches = vec![
            JobPatch::status(JobStatus::Resolving),
            JobPatch::default().resolved("C123", "Acme Channel"),
            JobPatch::default().items(Vec::new()),
            JobPatch::default().improved_items(Vec::new()),
        ];

        let tasks: Vec<_> = patches
            .into_iter()
            .map(|patch| {
                let store = store.clone();
                tokio::spawn(async move { store.merge(job.id, patch).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = store.get(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Resolving);
        assert_eq!(stored.resolved_id.as_deref(), Some("C123"));
        assert!(stored.items.is_some());
        assert!(stored.improved_items.is_some());
    }
}
