use std::time::Duration;

/// Structured diagnostic emitted at every orchestration stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A candidate resource is about to be tried.
    ResourceTrial {
        /// Diagnostic resource name.
        resource_name: String,
        /// 1-based position in the candidate list.
        position: usize,
    },
    /// A candidate could not be reached or built and was skipped.
    ResourceUnavailable {
        /// Diagnostic resource name.
        resource_name: String,
        /// Why the backend is unavailable.
        reason: String,
    },
    /// The lock is held.
    LockAcquired {
        /// Diagnostic resource name.
        resource_name: String,
        /// Time spent waiting for the lock.
        waited: Duration,
    },
    /// Another holder kept the lock for the whole timeout.
    LockTimedOut {
        /// Diagnostic resource name.
        resource_name: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// A job is starting.
    JobStarted {
        /// Job identity.
        job_name: String,
        /// 1-based registration position.
        position: usize,
        /// Number of registered jobs.
        total: usize,
    },
    /// A job finished successfully.
    JobCompleted {
        /// Job identity.
        job_name: String,
        /// 1-based registration position.
        position: usize,
        /// Job run time.
        elapsed: Duration,
    },
    /// A job returned an error.
    JobFailed {
        /// Job identity.
        job_name: String,
        /// 1-based registration position.
        position: usize,
        /// Rendered job error.
        error: String,
    },
    /// The lock was given back.
    LockReleased {
        /// Diagnostic resource name.
        resource_name: String,
    },
    /// Releasing failed; the backend frees the resource when the session or lease ends.
    LockReleaseFailed {
        /// Diagnostic resource name.
        resource_name: String,
        /// Rendered release error.
        error: String,
    },
}

impl RunEvent {
    /// Returns stable event name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceTrial { .. } => "resource_trial",
            Self::ResourceUnavailable { .. } => "resource_unavailable",
            Self::LockAcquired { .. } => "lock_acquired",
            Self::LockTimedOut { .. } => "lock_timed_out",
            Self::JobStarted { .. } => "job_started",
            Self::JobCompleted { .. } => "job_completed",
            Self::JobFailed { .. } => "job_failed",
            Self::LockReleased { .. } => "lock_released",
            Self::LockReleaseFailed { .. } => "lock_release_failed",
        }
    }
}

/// Consumer of orchestration diagnostics.
pub trait RunEventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: RunEvent);
}
