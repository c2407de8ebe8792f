use chrono::{DateTime, Utc};
use seqrun_core::{AppError, AppResult};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One row written by a startup job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StartupRunRecord {
    /// Row identifier.
    pub id: Uuid,
    /// Job that wrote the row.
    pub job_name: String,
    /// Host instance that ran the job.
    pub instance_id: String,
    /// Database time of the insert.
    pub recorded_at: DateTime<Utc>,
}

/// PostgreSQL-backed log of startup job executions.
#[derive(Clone)]
pub struct PostgresStartupRunRepository {
    pool: PgPool,
}

impl PostgresStartupRunRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one execution record.
    pub async fn record_run(&self, job_name: &str, instance_id: &str) -> AppResult<StartupRunRecord> {
        sqlx::query_as::<_, StartupRunRecord>(
            r#"
            INSERT INTO startup_job_runs (id, job_name, instance_id)
            VALUES ($1, $2, $3)
            RETURNING id, job_name, instance_id, recorded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_name)
        .bind(instance_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record startup job run: {error}")))
    }

    /// Lists records for `instance_id` in insertion order.
    pub async fn list_for_instance(&self, instance_id: &str) -> AppResult<Vec<StartupRunRecord>> {
        sqlx::query_as::<_, StartupRunRecord>(
            r#"
            SELECT id, job_name, instance_id, recorded_at
            FROM startup_job_runs
            WHERE instance_id = $1
            ORDER BY recorded_at, id
            "#,
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list startup job runs: {error}")))
    }
}
