use std::collections::HashMap;
use std::time::Duration;

use seqrun_domain::{FallbackPolicy, LockBackendKind, RunMode};

use super::HostConfig;

fn load(variables: &[(&str, &str)]) -> Result<HostConfig, seqrun_core::AppError> {
    let variables: HashMap<String, String> = variables
        .iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect();
    HostConfig::from_lookup(|name| variables.get(name).cloned(), false)
}

const DATABASE_URL: (&str, &str) = ("DATABASE_URL", "postgres://seqrun@localhost:5432/seqrun");

#[test]
fn defaults_use_postgres_lock_and_both_jobs() {
    let config = load(&[DATABASE_URL]);

    assert!(config.is_ok());
    let config = config.unwrap_or_else(|_| unreachable!());
    let kinds: Vec<LockBackendKind> = config
        .lock_resources
        .iter()
        .map(|resource| resource.kind())
        .collect();
    assert_eq!(kinds, vec![LockBackendKind::Postgres]);
    assert_eq!(config.jobs, vec!["apply_migrations", "record_startup"]);
    assert_eq!(config.run_mode, RunMode::BeforeServing);
    assert_eq!(config.fallback_policy, FallbackPolicy::StopOnTimeout);
    assert_eq!(config.timing.timeout(), Duration::from_secs(300));
    assert_eq!(config.timing.poll_interval(), Duration::from_millis(500));
    assert_eq!(config.api_port, 3001);
}

#[test]
fn database_url_is_required() {
    assert!(load(&[]).is_err());
}

#[test]
fn lock_resources_keep_configured_order() {
    let config = load(&[
        DATABASE_URL,
        ("SEQRUN_LOCK_RESOURCES", "redis, filesystem ,postgres"),
        ("SEQRUN_LOCK_DIRECTORY", "/srv/shared"),
        ("REDIS_URL", "redis://127.0.0.1:6379"),
        ("SEQRUN_REDIS_LEASE_SECONDS", "15"),
        ("SEQRUN_FALLBACK_ON_TIMEOUT", "TRUE"),
        ("SEQRUN_RUN_MODE", "on_demand"),
    ]);

    assert!(config.is_ok());
    let config = config.unwrap_or_else(|_| unreachable!());
    let kinds: Vec<LockBackendKind> = config
        .lock_resources
        .iter()
        .map(|resource| resource.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            LockBackendKind::Redis,
            LockBackendKind::FileSystem,
            LockBackendKind::Postgres,
        ]
    );
    assert_eq!(config.fallback_policy, FallbackPolicy::TryNextOnTimeout);
    assert_eq!(config.run_mode, RunMode::OnDemand);
}

#[test]
fn filesystem_lock_requires_directory() {
    let config = load(&[DATABASE_URL, ("SEQRUN_LOCK_RESOURCES", "filesystem")]);

    assert!(config.is_err());
}

#[test]
fn redis_lock_requires_url() {
    let config = load(&[DATABASE_URL, ("SEQRUN_LOCK_RESOURCES", "redis")]);

    assert!(config.is_err());
}

#[test]
fn unknown_backend_is_rejected() {
    let config = load(&[DATABASE_URL, ("SEQRUN_LOCK_RESOURCES", "etcd")]);

    assert!(config.is_err());
}

#[test]
fn poll_interval_longer_than_timeout_is_rejected() {
    let config = load(&[
        DATABASE_URL,
        ("SEQRUN_ACQUIRE_TIMEOUT_MS", "100"),
        ("SEQRUN_POLL_INTERVAL_MS", "500"),
    ]);

    assert!(config.is_err());
}

#[test]
fn socket_address_rejects_hostnames() {
    let config = load(&[DATABASE_URL, ("API_HOST", "localhost")]);

    assert!(config.is_ok());
    let config = config.unwrap_or_else(|_| unreachable!());
    assert!(config.socket_address().is_err());
}
