//! Integration tests for the title pipeline.
//!
//! Each test runs the real engine with every stage registered, over mock
//! adapters, and checks both the event chain and what ended up in the store.

mod common;

use std::sync::Arc;

use async_trait::async_trait;

use crate::common::TestHarness;
use test_context::test_context;
use title_doctor::common::{AdapterError, JobId, StoreError};
use title_doctor::domains::jobs::{InMemoryJobStore, Job, JobStatus, JobStore, Revision};
use title_doctor::domains::pipeline::report::{self, FAILURE_BODY, FAILURE_SUBJECT};
use title_doctor::domains::pipeline::{topics, PipelineEvent, StageFailure};
use title_doctor::kernel::test_dependencies::{
    MockContentLister, MockIdentityResolver, MockNotifier, MockTextImprover,
};
use title_doctor::kernel::{ServerDeps, TestDependencies};
use title_doctor::Config;

const CONTACT: &str = "user@example.com";

// =============================================================================
// Happy path
// =============================================================================

/// A resolvable channel with videos ends in one report email and a completed job.
#[test_context(TestHarness)]
#[tokio::test]
async fn happy_path_delivers_report_and_completes(ctx: &TestHarness) {
    let job = ctx.submit("AcmeChannel", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVED,
            topics::LISTED,
            topics::IMPROVED,
            topics::DONE
        ]
    );

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    assert_eq!(job.resolved_id.as_deref(), Some("C123"));
    assert_eq!(job.resolved_name.as_deref(), Some("Acme Channel"));
    assert_eq!(job.items.as_ref().map(Vec::len), Some(5));
    assert_eq!(job.delivery_receipt_id.as_deref(), Some("receipt-1"));
    assert!(job.completed_at.is_some());

    let improved = job.improved_items.unwrap();
    assert_eq!(improved.len(), 5);
    assert_eq!(improved[0].original, "Video 1");
    assert_eq!(improved[0].improved, "Improved: Video 1");
    assert_eq!(improved[4].url, "https://www.youtube.com/watch?v=vid5");

    let sent = ctx.deps.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address, CONTACT);
    assert_eq!(sent[0].subject, "Your Improved YouTube Titles for Acme Channel");
    for n in 1..=5 {
        assert!(sent[0].body.contains(&format!("Improved Title: Improved: Video {n}")));
    }
}

/// Each adapter is called exactly once, with the previous stage's output.
#[test_context(TestHarness)]
#[tokio::test]
async fn stages_feed_each_other(ctx: &TestHarness) {
    ctx.submit("@acme", CONTACT).await.unwrap();

    assert_eq!(ctx.deps.identity_resolver.calls(), vec!["@acme".to_string()]);
    assert_eq!(
        ctx.deps.content_lister.calls(),
        vec![("C123".to_string(), 5)]
    );

    let improve_calls = ctx.deps.text_improver.calls();
    assert_eq!(improve_calls.len(), 1);
    assert_eq!(improve_calls[0].display_name, "Acme Channel");
    assert_eq!(
        improve_calls[0].titles,
        (1..=5).map(|n| format!("Video {n}")).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn configured_item_limit_is_passed_to_the_lister() {
    let ctx = TestHarness::with_deps(TestDependencies::new().max_items(2)).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(ctx.deps.content_lister.calls(), vec![("C123".to_string(), 2)]);
    assert_eq!(job.improved_items.map(|items| items.len()), Some(2));
}

/// Jobs are independent: each one gets its own chain and its own report.
#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_jobs_complete_independently(ctx: &TestHarness) {
    let (first, second) = tokio::join!(
        ctx.submit("Acme", "first@example.com"),
        ctx.submit("Globex", "second@example.com"),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(ctx.deps.notifier.sent_to("first@example.com").len(), 1);
    assert_eq!(ctx.deps.notifier.sent_to("second@example.com").len(), 1);
    assert_eq!(ctx.tap.count(topics::DONE), 2);
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn unknown_channel_fails_at_resolve() {
    let deps = TestDependencies::new().mock_resolver(MockIdentityResolver::new().not_found());
    let ctx = TestHarness::with_deps(deps).unwrap();

    let job = ctx.submit("NoSuchChannel", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVE_FAILED,
            topics::ERROR_NOTIFIED
        ]
    );
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("No channel found for \"NoSuchChannel\"")
    );
    assert!(job.resolved_id.is_none());
    assert_eq!(ctx.deps.content_lister.call_count(), 0);
}

#[tokio::test]
async fn channel_without_videos_fails_at_list() {
    let deps = TestDependencies::new().mock_lister(MockContentLister::empty());
    let ctx = TestHarness::with_deps(deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(ctx.tap.count(topics::LIST_FAILED), 1);
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Channel \"Acme Channel\" has no videos")
    );
    // Resolve output stays on the record
    assert_eq!(job.resolved_id.as_deref(), Some("C123"));
    assert_eq!(ctx.deps.text_improver.call_count(), 0);
}

/// An improver outage produces exactly one generic failure notice.
#[tokio::test]
async fn improver_outage_sends_one_generic_notice() {
    let deps = TestDependencies::new().mock_improver(
        MockTextImprover::new().with_error(AdapterError::transport("openai", "connection reset")),
    );
    let ctx = TestHarness::with_deps(deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVED,
            topics::LISTED,
            topics::IMPROVE_FAILED,
            topics::ERROR_NOTIFIED
        ]
    );
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("connection reset"));

    let sent = ctx.deps.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address, CONTACT);
    assert_eq!(sent[0].subject, FAILURE_SUBJECT);
    assert_eq!(sent[0].body, FAILURE_BODY);
    assert!(!sent[0].body.contains("connection reset"));

    let notified = ctx.tap.events().into_iter().find_map(|e| match e {
        PipelineEvent::ErrorNotified {
            delivery_receipt_id,
            ..
        } => Some(delivery_receipt_id),
        _ => None,
    });
    assert_eq!(notified, Some(Some("receipt-1".to_string())));
}

#[tokio::test]
async fn misaligned_improver_answer_fails_the_job() {
    let deps = TestDependencies::new().mock_improver(MockTextImprover::new().short_by_one());
    let ctx = TestHarness::with_deps(deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(ctx.tap.count(topics::IMPROVE_FAILED), 1);
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.improved_items.is_none());
}

/// The report cannot be delivered: notify-failed, then the error notifier
/// also fails to deliver and the chain still ends with error-notified.
#[tokio::test]
async fn undeliverable_report_still_ends_the_chain() {
    let deps = TestDependencies::new().mock_notifier(
        MockNotifier::new().with_error(AdapterError::transport("resend", "503 Service Unavailable")),
    );
    let ctx = TestHarness::with_deps(deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVED,
            topics::LISTED,
            topics::IMPROVED,
            topics::NOTIFY_FAILED,
            topics::ERROR_NOTIFIED
        ]
    );
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.delivery_receipt_id.is_none());
    assert!(job.improved_items.is_some());

    // Report attempt, then failure notice attempt
    let sent = ctx.deps.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, FAILURE_SUBJECT);

    assert!(matches!(
        ctx.tap.events().last(),
        Some(PipelineEvent::ErrorNotified {
            delivery_receipt_id: None,
            ..
        })
    ));
}

/// Without credentials every adapter refuses, and the job still fails cleanly.
#[tokio::test]
async fn missing_credentials_fail_inside_the_stage() {
    let deps = TestDependencies::new();
    let server_deps = ServerDeps::from_config(&Config::default(), deps.jobs.clone());
    let ctx = TestHarness::with_server_deps(deps, server_deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVE_FAILED,
            topics::ERROR_NOTIFIED
        ]
    );
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().starts_with("configuration error"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn event_for_unknown_job_emits_failure(ctx: &TestHarness) {
    let job_id = JobId::new();

    ctx.redeliver(PipelineEvent::Submitted {
        job_id,
        subject_query: "Acme".into(),
        contact_address: CONTACT.into(),
    })
    .await
    .unwrap();

    let failure = ctx
        .tap
        .events()
        .into_iter()
        .find_map(|e| match e {
            PipelineEvent::ResolveFailed(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(failure.job_id, job_id);
    assert!(failure.error.contains("not found"));

    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 1);
    assert_eq!(ctx.deps.identity_resolver.call_count(), 0);
    assert!(ctx.deps.jobs.load(job_id).await.unwrap().is_none());
}

// =============================================================================
// Redelivery
// =============================================================================

/// A duplicate trigger for a stage that already ran does not call its adapter
/// again and emits nothing.
#[test_context(TestHarness)]
#[tokio::test]
async fn redelivered_trigger_is_ignored(ctx: &TestHarness) {
    let job = ctx.submit("Acme", CONTACT).await.unwrap();
    let events_before = ctx.tap.events().len();

    ctx.redeliver(PipelineEvent::Resolved {
        job_id: job.id,
        contact_address: CONTACT.into(),
        resolved_id: "C123".into(),
        resolved_name: "Acme Channel".into(),
    })
    .await
    .unwrap();

    // Only the redelivered event itself was observed
    assert_eq!(ctx.tap.events().len(), events_before + 1);
    assert_eq!(ctx.deps.content_lister.call_count(), 1);
    assert_eq!(ctx.deps.notifier.sent().len(), 1);
    assert_eq!(ctx.job(job.id).await.unwrap(), job);
}

/// A finished job never moves again, whatever is replayed.
#[tokio::test]
async fn failed_job_stays_failed() {
    let deps = TestDependencies::new().mock_lister(MockContentLister::empty());
    let ctx = TestHarness::with_deps(deps).unwrap();
    let job = ctx.submit("Acme", CONTACT).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);

    ctx.redeliver(PipelineEvent::Submitted {
        job_id: job.id,
        subject_query: "Acme".into(),
        contact_address: CONTACT.into(),
    })
    .await
    .unwrap();

    let after = ctx.job(job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Failed);
    assert_eq!(after.error, job.error);
    assert_eq!(ctx.deps.identity_resolver.call_count(), 1);
    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 1);
}

/// A duplicate failure event does not mail a second notice.
#[tokio::test]
async fn redelivered_failure_sends_no_second_notice() {
    let deps = TestDependencies::new().mock_lister(MockContentLister::empty());
    let ctx = TestHarness::with_deps(deps).unwrap();
    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(ctx.deps.notifier.sent().len(), 1);
    assert!(job.failure_notified_at.is_some());
    assert_eq!(job.failure_notice_receipt_id.as_deref(), Some("receipt-1"));

    ctx.redeliver(PipelineEvent::ListFailed(StageFailure::new(
        job.id,
        CONTACT,
        job.error.clone().unwrap(),
    )))
    .await
    .unwrap();

    assert_eq!(ctx.deps.notifier.sent().len(), 1);
    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 1);
    assert_eq!(ctx.job(job.id).await.unwrap(), job);
}

/// A late failure event for a completed job never follows the report with a
/// failure notice.
#[test_context(TestHarness)]
#[tokio::test]
async fn failure_event_for_completed_job_is_ignored(ctx: &TestHarness) {
    let job = ctx.submit("Acme", CONTACT).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    ctx.redeliver(PipelineEvent::ImproveFailed(StageFailure::new(
        job.id,
        CONTACT,
        "connection reset",
    )))
    .await
    .unwrap();

    let sent = ctx.deps.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, report::success_subject("Acme Channel"));
    assert_eq!(ctx.tap.count(topics::ERROR_NOTIFIED), 0);

    let after = ctx.job(job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Completed);
    assert!(after.failure_notified_at.is_none());
}

/// A failure without a contact address is recorded and closes the chain, but
/// nothing is mailed.
#[test_context(TestHarness)]
#[tokio::test]
async fn failure_without_contact_address_is_not_mailed(ctx: &TestHarness) {
    let job = Job::new("Acme", CONTACT);
    ctx.deps.jobs.create(&job).await.unwrap();

    ctx.redeliver(PipelineEvent::ListFailed(StageFailure {
        job_id: job.id,
        contact_address: None,
        error: "boom".into(),
    }))
    .await
    .unwrap();

    assert!(ctx.deps.notifier.sent().is_empty());

    let notified: Vec<_> = ctx
        .tap
        .events()
        .into_iter()
        .filter(|e| matches!(e, PipelineEvent::ErrorNotified { .. }))
        .collect();
    assert_eq!(
        notified,
        vec![PipelineEvent::ErrorNotified {
            job_id: job.id,
            contact_address: None,
            delivery_receipt_id: None,
        }]
    );

    let after = ctx.job(job.id).await.unwrap();
    assert!(after.failure_notified_at.is_some());
    assert!(after.failure_notice_receipt_id.is_none());
}

// =============================================================================
// Store errors
// =============================================================================

/// In-memory store that refuses to save a job carrying a delivery receipt.
struct ReceiptRejectingStore {
    inner: Arc<InMemoryJobStore>,
}

#[async_trait]
impl JobStore for ReceiptRejectingStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        self.inner.create(job).await
    }

    async fn load(&self, id: JobId) -> Result<Option<(Job, Revision)>, StoreError> {
        self.inner.load(id).await
    }

    async fn save(&self, job: &Job, expected: Revision) -> Result<Revision, StoreError> {
        if job.delivery_receipt_id.is_some() {
            return Err(StoreError::Backend(anyhow::anyhow!("disk full")));
        }
        self.inner.save(job, expected).await
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Once the report went out, a store error while recording it does not turn
/// into a failure notice.
#[tokio::test]
async fn store_error_after_delivery_still_ends_in_done() {
    let deps = TestDependencies::new();
    let store = Arc::new(ReceiptRejectingStore {
        inner: deps.jobs.clone(),
    });
    let server_deps = ServerDeps::new(
        store,
        deps.identity_resolver.clone(),
        deps.content_lister.clone(),
        deps.text_improver.clone(),
        deps.notifier.clone(),
        deps.max_items,
    );
    let ctx = TestHarness::with_server_deps(deps, server_deps).unwrap();

    let job = ctx.submit("Acme", CONTACT).await.unwrap();

    assert_eq!(
        ctx.tap.topics(),
        vec![
            topics::SUBMITTED,
            topics::RESOLVED,
            topics::LISTED,
            topics::IMPROVED,
            topics::DONE
        ]
    );
    assert_eq!(ctx.deps.notifier.sent().len(), 1);
    assert_eq!(job.status, JobStatus::Notifying);
    assert!(job.delivery_receipt_id.is_none());
}
