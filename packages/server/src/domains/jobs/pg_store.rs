//! Postgres-backed job store.
//!
//! The job is stored as a JSONB document next to a `revision` counter; the
//! compare-and-swap in `save` is a single conditional UPDATE.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::models::job::Job;
use super::store::{JobStore, Revision};
use crate::common::{JobId, StoreError};

pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, status, document, revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(Json(job))
        .bind(Revision::INITIAL.0)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(job.id));
        }
        Ok(())
    }

    async fn load(&self, id: JobId) -> Result<Option<(Job, Revision)>, StoreError> {
        let row: Option<(Json<Job>, i64)> =
            sqlx::query_as("SELECT document, revision FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(job), revision)| (job, Revision(revision))))
    }

    async fn save(&self, job: &Job, expected: Revision) -> Result<Revision, StoreError> {
        let saved: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE jobs
            SET status = $2,
                document = $3,
                revision = revision + 1,
                updated_at = $4
            WHERE id = $1 AND revision = $5
            RETURNING revision
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(Json(job))
        .bind(job.updated_at)
        .bind(expected.0)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((revision,)) = saved {
            return Ok(Revision(revision));
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT revision FROM jobs WHERE id = $1")
            .bind(job.id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Err(StoreError::Conflict {
                job_id: job.id,
                attempts: 1,
            }),
            None => Err(StoreError::NotFound(job.id)),
        }
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
