use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seqrun_core::AppResult;
use seqrun_domain::{AcquireTiming, LockResourceConfig};

/// Backend-owned state of one held lock.
///
/// Dropping the value without calling [`HeldLock::release`] must still free the
/// resource eventually (closed session, closed file handle, expiring lease).
#[async_trait]
pub trait HeldLock: Send {
    /// Gives the lock back to the backend.
    async fn release(self: Box<Self>) -> AppResult<()>;
}

/// Opaque token for the current exclusive ownership of one resource.
pub struct LockHandle {
    resource_name: String,
    acquired_at: DateTime<Utc>,
    held: Box<dyn HeldLock>,
}

impl LockHandle {
    /// Wraps backend lock state acquired for `resource_name`.
    #[must_use]
    pub fn new(resource_name: impl Into<String>, held: impl HeldLock + 'static) -> Self {
        Self {
            resource_name: resource_name.into(),
            acquired_at: Utc::now(),
            held: Box::new(held),
        }
    }

    /// Returns the diagnostic name of the locked resource.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        self.resource_name.as_str()
    }

    /// Returns when the lock was acquired.
    #[must_use]
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Releases the lock, consuming the handle.
    pub async fn release(self) -> AppResult<()> {
        self.held.release().await
    }
}

impl Debug for LockHandle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LockHandle")
            .field("resource_name", &self.resource_name)
            .field("acquired_at", &self.acquired_at)
            .finish_non_exhaustive()
    }
}

/// Result of one acquisition attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The caller is now the exclusive holder.
    Acquired(LockHandle),
    /// The resource exists but another holder kept it for the whole timeout.
    TimedOut,
    /// The backend could not be reached or opened.
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },
}

/// Cross-instance mutual exclusion port implemented by each lock backend.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Returns a stable diagnostic identity such as `file system directory [/srv]`.
    fn resource_name(&self) -> String;

    /// Tries to become the exclusive holder, polling while another holder is present.
    async fn try_acquire(&self, timing: AcquireTiming) -> AcquireOutcome;

    /// Releases a handle produced by [`LockProvider::try_acquire`].
    ///
    /// Implementations must tolerate handles whose session or lease already ended.
    async fn release(&self, handle: LockHandle) -> AppResult<()> {
        handle.release().await
    }
}

/// Builds a lock provider for one configured resource.
pub trait LockProviderFactory: Send + Sync {
    /// Returns the provider backing `resource`.
    fn provider_for(&self, resource: &LockResourceConfig) -> AppResult<Arc<dyn LockProvider>>;
}
