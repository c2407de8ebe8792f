use std::future::Future;

use async_trait::async_trait;
use seqrun_core::AppResult;

/// One-time startup operation executed while the fleet-wide lock is held.
///
/// Jobs may run again after a failed run restarts the process, so bodies should
/// be idempotent.
#[async_trait]
pub trait StartupJob: Send + Sync {
    /// Returns the stable identity used for ordering diagnostics and duplicate checks.
    fn name(&self) -> &str;

    /// Runs the job to completion.
    async fn run(&self) -> AppResult<()>;
}

/// Startup job backed by an async closure.
pub struct FnStartupJob<F> {
    name: String,
    run: F,
}

impl<F, Fut> FnStartupJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    /// Creates a named job from a zero-argument async function.
    #[must_use]
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

#[async_trait]
impl<F, Fut> StartupJob for FnStartupJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn run(&self) -> AppResult<()> {
        (self.run)().await
    }
}
