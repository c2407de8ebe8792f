use std::sync::Arc;

use async_trait::async_trait;
use seqrun_application::StartupJob;
use seqrun_core::{AppError, AppResult};
use seqrun_infrastructure::PostgresStartupRunRepository;
use sqlx::PgPool;
use tracing::info;

pub const APPLY_MIGRATIONS_JOB: &str = "apply_migrations";
pub const RECORD_STARTUP_JOB: &str = "record_startup";

/// Applies the workspace SQL migrations.
pub struct ApplyMigrationsJob {
    pool: PgPool,
}

impl ApplyMigrationsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StartupJob for ApplyMigrationsJob {
    fn name(&self) -> &str {
        APPLY_MIGRATIONS_JOB
    }

    async fn run(&self) -> AppResult<()> {
        sqlx::migrate!("../../crates/infrastructure/migrations")
            .run(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

        info!("database migrations applied successfully");
        Ok(())
    }
}

/// Records that this instance completed its startup work.
pub struct RecordStartupJob {
    repository: PostgresStartupRunRepository,
    instance_id: String,
}

impl RecordStartupJob {
    pub fn new(repository: PostgresStartupRunRepository, instance_id: impl Into<String>) -> Self {
        Self {
            repository,
            instance_id: instance_id.into(),
        }
    }
}

#[async_trait]
impl StartupJob for RecordStartupJob {
    fn name(&self) -> &str {
        RECORD_STARTUP_JOB
    }

    async fn run(&self) -> AppResult<()> {
        let record = self
            .repository
            .record_run(RECORD_STARTUP_JOB, self.instance_id.as_str())
            .await?;

        info!(
            instance_id = %record.instance_id,
            recorded_at = %record.recorded_at,
            "recorded startup run"
        );
        Ok(())
    }
}

/// Resolves configured job identities to jobs, keeping the configured order.
///
/// Repeated identities are kept so the orchestrator reports them as duplicates.
pub fn job_catalog(
    names: &[String],
    pool: &PgPool,
    instance_id: &str,
) -> AppResult<Vec<Arc<dyn StartupJob>>> {
    names
        .iter()
        .map(|name| -> AppResult<Arc<dyn StartupJob>> {
            match name.as_str() {
                APPLY_MIGRATIONS_JOB => Ok(Arc::new(ApplyMigrationsJob::new(pool.clone()))),
                RECORD_STARTUP_JOB => Ok(Arc::new(RecordStartupJob::new(
                    PostgresStartupRunRepository::new(pool.clone()),
                    instance_id,
                ))),
                other => Err(AppError::Validation(format!(
                    "unknown startup job '{other}', expected '{APPLY_MIGRATIONS_JOB}' or \
                     '{RECORD_STARTUP_JOB}'"
                ))),
            }
        })
        .collect()
}
