use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::lock_ports::LockProviderFactory;
use crate::run_events::RunEventSink;
use crate::run_options::RunOptions;
use crate::run_result::{RunError, RunReport, RunResult, RunStage};

mod acquisition;
mod execution;

/// Runs the registered startup jobs once, in order, while holding a fleet-wide lock.
#[derive(Clone)]
pub struct LockAndRunService {
    options: Arc<RunOptions>,
    provider_factory: Arc<dyn LockProviderFactory>,
    event_sink: Arc<dyn RunEventSink>,
}

impl LockAndRunService {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        options: RunOptions,
        provider_factory: Arc<dyn LockProviderFactory>,
        event_sink: Arc<dyn RunEventSink>,
    ) -> Self {
        Self {
            options: Arc::new(options),
            provider_factory,
            event_sink,
        }
    }

    /// Returns the options this orchestrator runs with.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        self.options.as_ref()
    }

    /// Acquires the first available lock, runs every job and releases the lock.
    pub async fn run_once(&self) -> RunResult {
        self.run_once_with_cancellation(&CancellationToken::new())
            .await
    }

    /// Same as [`LockAndRunService::run_once`], stopping early when `cancel` fires.
    ///
    /// A held lock is always released before this returns, cancelled or not.
    pub async fn run_once_with_cancellation(&self, cancel: &CancellationToken) -> RunResult {
        let started_at = Utc::now();
        self.validate_options()?;

        let (provider, handle) = self.acquire_first_available(cancel).await?;
        let resource_name = handle.resource_name().to_owned();

        let execution = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RunError::Cancelled {
                stage: RunStage::JobExecution,
            }),
            result = self.execute_jobs() => result,
        };

        self.release_lock(provider.as_ref(), handle).await;
        let jobs_run = execution?;

        Ok(RunReport {
            resource_name,
            jobs_run,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn validate_options(&self) -> Result<(), RunError> {
        if self.options.lock_resources().is_empty() {
            return Err(RunError::NoResourceAvailable { tried: Vec::new() });
        }

        self.options.jobs().validate()
    }
}
