//! Test harness for pipeline and route tests.
//!
//! Every harness gets its own engine over an in-memory job store and the mock
//! adapters from `kernel::test_dependencies`, plus a [`RecordingTap`] that
//! sees every pipeline event. Postgres is only needed by the `#[ignore]`d
//! store tests; that container is started once and shared.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use seesaw::testing::RecordingTap;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use title_doctor::common::JobId;
use title_doctor::domains::jobs::{Job, JobStore};
use title_doctor::domains::pipeline::{pipeline_builder, PipelineEvent, PipelineHandle};
use title_doctor::kernel::{ServerDeps, TestDependencies};
use title_doctor::server::{build_app, AppState};
use tokio::sync::OnceCell;

/// Initialize tracing once; respects RUST_LOG.
/// Run tests with: RUST_LOG=title_doctor=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestHarness {
    /// Mocks and store, shared with the running engine
    pub deps: TestDependencies,
    pub tap: RecordingTap<PipelineEvent>,
    pub pipeline: PipelineHandle,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.pipeline.abort();
    }
}

impl TestHarness {
    /// Harness with the default mocks: the channel resolves, five videos are
    /// listed, every title is improved and every message is delivered.
    pub fn new() -> Result<Self> {
        Self::with_deps(TestDependencies::new())
    }

    pub fn with_deps(deps: TestDependencies) -> Result<Self> {
        let server_deps = deps.server_deps();
        Self::start(deps, server_deps)
    }

    /// Run the engine over `server_deps` instead of the mocks. The harness
    /// still reads jobs from `deps.jobs`, so `server_deps` must share it.
    pub fn with_server_deps(deps: TestDependencies, server_deps: ServerDeps) -> Result<Self> {
        Self::start(deps, server_deps)
    }

    fn start(deps: TestDependencies, server_deps: ServerDeps) -> Result<Self> {
        init_tracing();

        let tap = RecordingTap::new();
        let pipeline = pipeline_builder(server_deps)
            .with_event_tap(tap.clone())
            .build()
            .context("Failed to build pipeline")?
            .start();

        Ok(Self {
            deps,
            tap,
            pipeline,
        })
    }

    /// Record a job and run its whole event chain to the end.
    pub async fn submit(&self, subject_query: &str, contact_address: &str) -> Result<Job> {
        let job = Job::new(subject_query, contact_address);
        self.deps.jobs.create(&job).await?;

        self.pipeline
            .emit_and_await(PipelineEvent::Submitted {
                job_id: job.id,
                subject_query: job.subject_query.clone(),
                contact_address: job.contact_address.clone(),
            })
            .await?;

        self.job(job.id).await
    }

    /// Emit `event` and wait for everything it triggers.
    pub async fn redeliver(&self, event: PipelineEvent) -> Result<()> {
        self.pipeline.emit_and_await(event).await?;
        Ok(())
    }

    pub async fn job(&self, job_id: JobId) -> Result<Job> {
        Ok(self.deps.jobs.get(job_id).await?)
    }

    /// Poll the store until the job is completed or failed.
    ///
    /// For jobs started over HTTP, where submission does not wait.
    pub async fn wait_for_terminal(&self, job_id: JobId) -> Result<Job> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let job = self.job(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("job {} still {} after 5s", job_id, job.status);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll the tap until the job's chain has ended on the bus.
    pub async fn wait_for_terminal_event(&self, job_id: JobId) -> Result<()> {
        let key = job_id.to_string();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !self
            .tap
            .events_for_key(&key)
            .iter()
            .any(PipelineEvent::is_terminal)
        {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("no terminal event for job {} after 5s", job_id);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    /// Router wired to this harness' engine and store.
    pub fn app(&self) -> Router {
        build_app(
            AppState::new(self.pipeline.clone(), self.deps.jobs.clone()),
            &[],
        )
    }
}

// =============================================================================
// Shared Postgres
// =============================================================================

struct SharedPostgres {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

impl SharedPostgres {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }
}

/// Fresh pool on the shared, migrated Postgres container (requires Docker).
pub async fn postgres_pool() -> Result<PgPool> {
    let shared = SHARED_POSTGRES.get_or_try_init(SharedPostgres::init).await?;
    PgPool::connect(&shared.db_url)
        .await
        .context("Failed to connect to test database")
}
