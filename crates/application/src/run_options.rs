use std::sync::Arc;

use seqrun_domain::{AcquireTiming, FallbackPolicy, LockResourceConfig, RunMode};

use crate::job_ports::StartupJob;
use crate::job_registry::JobRegistry;

/// Candidate lock resources, jobs and timing for one orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    lock_resources: Vec<LockResourceConfig>,
    jobs: JobRegistry,
    run_mode: RunMode,
    timing: AcquireTiming,
    fallback_policy: FallbackPolicy,
}

impl RunOptions {
    /// Creates options with default timing, `BeforeServing` mode and no resources or jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate lock resource. Earlier resources are tried first.
    pub fn add_lock_resource(&mut self, resource: LockResourceConfig) -> &mut Self {
        self.lock_resources.push(resource);
        self
    }

    /// Appends a job to run while the lock is held.
    pub fn register_job(&mut self, job: Arc<dyn StartupJob>) -> &mut Self {
        self.jobs.register(job);
        self
    }

    /// Sets when the host invokes the orchestrator.
    #[must_use]
    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    /// Sets acquisition timeout and poll interval.
    #[must_use]
    pub fn with_timing(mut self, timing: AcquireTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the behavior for contended resources.
    #[must_use]
    pub fn with_fallback_policy(mut self, fallback_policy: FallbackPolicy) -> Self {
        self.fallback_policy = fallback_policy;
        self
    }

    /// Returns candidate resources in trial order.
    #[must_use]
    pub fn lock_resources(&self) -> &[LockResourceConfig] {
        self.lock_resources.as_slice()
    }

    /// Returns registered jobs.
    #[must_use]
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Returns when the host invokes the orchestrator.
    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Returns acquisition timing.
    #[must_use]
    pub fn timing(&self) -> AcquireTiming {
        self.timing
    }

    /// Returns the behavior for contended resources.
    #[must_use]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }
}
