use seqrun_application::{RunEvent, RunEventSink};
use tracing::{info, warn};

/// Writes orchestration events as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRunEventSink;

impl TracingRunEventSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RunEventSink for TracingRunEventSink {
    fn record(&self, event: RunEvent) {
        match event {
            RunEvent::ResourceTrial {
                resource_name,
                position,
            } => info!(
                resource = %resource_name,
                position,
                "trying startup lock resource"
            ),
            RunEvent::ResourceUnavailable {
                resource_name,
                reason,
            } => warn!(
                resource = %resource_name,
                reason = %reason,
                "startup lock resource unavailable, trying next"
            ),
            RunEvent::LockAcquired {
                resource_name,
                waited,
            } => info!(
                resource = %resource_name,
                waited_ms = waited.as_millis(),
                "acquired startup lock"
            ),
            RunEvent::LockTimedOut {
                resource_name,
                timeout,
            } => warn!(
                resource = %resource_name,
                timeout_ms = timeout.as_millis(),
                "timed out waiting for startup lock"
            ),
            RunEvent::JobStarted {
                job_name,
                position,
                total,
            } => info!(job = %job_name, position, total, "running startup job"),
            RunEvent::JobCompleted {
                job_name,
                position,
                elapsed,
            } => info!(
                job = %job_name,
                position,
                elapsed_ms = elapsed.as_millis(),
                "startup job completed"
            ),
            RunEvent::JobFailed {
                job_name,
                position,
                error,
            } => warn!(job = %job_name, position, error = %error, "startup job failed"),
            RunEvent::LockReleased { resource_name } => {
                info!(resource = %resource_name, "released startup lock");
            }
            RunEvent::LockReleaseFailed {
                resource_name,
                error,
            } => warn!(
                resource = %resource_name,
                error = %error,
                "failed to release startup lock"
            ),
        }
    }
}
