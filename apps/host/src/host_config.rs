use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use seqrun_core::AppError;
use seqrun_domain::{
    AcquireTiming, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_LOCK_NAME, DEFAULT_POLL_INTERVAL,
    DEFAULT_REDIS_LEASE_SECONDS, FallbackPolicy, LockBackendKind, LockResourceConfig, RunMode,
};
use tracing_subscriber::EnvFilter;

use crate::startup_jobs::{APPLY_MIGRATIONS_JOB, RECORD_STARTUP_JOB};

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub run_once: bool,
    pub database_url: String,
    pub lock_resources: Vec<LockResourceConfig>,
    pub jobs: Vec<String>,
    pub instance_id: String,
    pub run_mode: RunMode,
    pub timing: AcquireTiming,
    pub fallback_policy: FallbackPolicy,
    pub api_host: String,
    pub api_port: u16,
}

impl HostConfig {
    pub fn load() -> Result<Self, AppError> {
        let run_once = env::args().nth(1).as_deref() == Some("run-once");
        Self::from_lookup(|name| env::var(name).ok(), run_once)
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        run_once: bool,
    ) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = optional("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let lock_name = optional("SEQRUN_LOCK_NAME").unwrap_or_else(|| DEFAULT_LOCK_NAME.to_owned());
        let redis_lease_seconds = match optional("SEQRUN_REDIS_LEASE_SECONDS") {
            Some(value) => value.trim().parse::<u32>().map_err(|error| {
                AppError::Validation(format!("invalid SEQRUN_REDIS_LEASE_SECONDS: {error}"))
            })?,
            None => DEFAULT_REDIS_LEASE_SECONDS,
        };

        let backends = comma_list(
            optional("SEQRUN_LOCK_RESOURCES").unwrap_or_else(|| "postgres".to_owned()),
        )
        .iter()
        .map(|value| LockBackendKind::from_str(value.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

        let mut lock_resources = Vec::with_capacity(backends.len());
        for backend in backends {
            let resource = match backend {
                LockBackendKind::Postgres => {
                    LockResourceConfig::postgres(database_url.as_str(), lock_name.as_str())?
                }
                LockBackendKind::FileSystem => {
                    let directory = optional("SEQRUN_LOCK_DIRECTORY").ok_or_else(|| {
                        AppError::Validation(
                            "SEQRUN_LOCK_DIRECTORY is required for the filesystem lock".to_owned(),
                        )
                    })?;
                    LockResourceConfig::file_system(PathBuf::from(directory))?
                }
                LockBackendKind::Redis => {
                    let redis_url = optional("REDIS_URL").ok_or_else(|| {
                        AppError::Validation("REDIS_URL is required for the redis lock".to_owned())
                    })?;
                    LockResourceConfig::redis(redis_url, lock_name.as_str(), redis_lease_seconds)?
                }
            };
            lock_resources.push(resource);
        }

        let jobs = comma_list(optional("SEQRUN_JOBS").unwrap_or_else(|| {
            format!("{APPLY_MIGRATIONS_JOB},{RECORD_STARTUP_JOB}")
        }));

        let run_mode = optional("SEQRUN_RUN_MODE")
            .map(|value| RunMode::from_str(value.as_str()))
            .transpose()?
            .unwrap_or_default();

        let timeout = duration_ms(
            optional("SEQRUN_ACQUIRE_TIMEOUT_MS"),
            "SEQRUN_ACQUIRE_TIMEOUT_MS",
            DEFAULT_ACQUIRE_TIMEOUT,
        )?;
        let poll_interval = duration_ms(
            optional("SEQRUN_POLL_INTERVAL_MS"),
            "SEQRUN_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL,
        )?;
        let timing = AcquireTiming::new(timeout, poll_interval)?;

        let fallback_policy = if optional("SEQRUN_FALLBACK_ON_TIMEOUT")
            .unwrap_or_else(|| "false".to_owned())
            .eq_ignore_ascii_case("true")
        {
            FallbackPolicy::TryNextOnTimeout
        } else {
            FallbackPolicy::StopOnTimeout
        };

        let instance_id =
            optional("SEQRUN_INSTANCE_ID").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = optional("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        Ok(Self {
            run_once,
            database_url,
            lock_resources,
            jobs,
            instance_id,
            run_mode,
            timing,
            fallback_policy,
            api_host,
            api_port,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn comma_list(value: String) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn duration_ms(value: Option<String>, name: &str, default: Duration) -> Result<Duration, AppError> {
    match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests;
