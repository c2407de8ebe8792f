//! Application services and ports.

#![forbid(unsafe_code)]

mod job_ports;
mod job_registry;
mod lock_and_run_service;
mod lock_ports;
mod run_events;
mod run_options;
mod run_result;

pub use job_ports::{FnStartupJob, StartupJob};
pub use job_registry::{JobDescriptor, JobRegistry};
pub use lock_and_run_service::LockAndRunService;
pub use lock_ports::{AcquireOutcome, HeldLock, LockHandle, LockProvider, LockProviderFactory};
pub use run_events::{RunEvent, RunEventSink};
pub use run_options::RunOptions;
pub use run_result::{RunError, RunReport, RunResult, RunStage};
