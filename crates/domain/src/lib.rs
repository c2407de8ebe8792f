//! Domain types describing lock resources and run configuration.

#![forbid(unsafe_code)]

mod lock_resource;
mod run_mode;
mod timing;

pub use lock_resource::{
    DEFAULT_LOCK_FILE_NAME, DEFAULT_LOCK_NAME, DEFAULT_REDIS_LEASE_SECONDS, LockBackend,
    LockBackendKind, LockResourceConfig, lock_file_path,
};
pub use run_mode::{FallbackPolicy, RunMode};
pub use timing::{AcquireTiming, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_POLL_INTERVAL};
