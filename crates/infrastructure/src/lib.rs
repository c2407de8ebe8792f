//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod backend_lock_provider_factory;
mod file_system_lock_provider;
mod in_memory_run_event_sink;
mod lock_polling;
mod postgres_advisory_lock_provider;
mod postgres_startup_run_repository;
mod redis_lease_lock_provider;
mod tracing_run_event_sink;

pub use backend_lock_provider_factory::BackendLockProviderFactory;
pub use file_system_lock_provider::FileSystemLockProvider;
pub use in_memory_run_event_sink::InMemoryRunEventSink;
pub use postgres_advisory_lock_provider::{PostgresAdvisoryLockProvider, advisory_lock_key};
pub use postgres_startup_run_repository::{PostgresStartupRunRepository, StartupRunRecord};
pub use redis_lease_lock_provider::RedisLeaseLockProvider;
pub use tracing_run_event_sink::TracingRunEventSink;
