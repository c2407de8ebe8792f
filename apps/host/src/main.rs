//! seqrun host composition root.

#![forbid(unsafe_code)]

mod host_config;
mod router;
mod startup_jobs;

use std::sync::Arc;

use seqrun_application::{LockAndRunService, RunError, RunOptions, RunResult};
use seqrun_core::AppError;
use seqrun_domain::RunMode;
use seqrun_infrastructure::{BackendLockProviderFactory, TracingRunEventSink};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::host_config::{HostConfig, init_tracing};
use crate::router::{HostState, StartupStatus, build_router};
use crate::startup_jobs::job_catalog;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = HostConfig::load()?;

    // Connections are opened by the jobs, after the lock is held.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(&config.database_url)
        .map_err(|error| AppError::Validation(format!("invalid DATABASE_URL: {error}")))?;

    let mut options = RunOptions::new()
        .with_run_mode(config.run_mode)
        .with_timing(config.timing)
        .with_fallback_policy(config.fallback_policy);
    for resource in config.lock_resources.iter().cloned() {
        options.add_lock_resource(resource);
    }
    for job in job_catalog(&config.jobs, &pool, config.instance_id.as_str())? {
        options.register_job(job);
    }

    let service = LockAndRunService::new(
        options,
        Arc::new(BackendLockProviderFactory::new()),
        Arc::new(TracingRunEventSink::new()),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    info!(
        instance_id = %config.instance_id,
        run_mode = config.run_mode.as_str(),
        lock_resources = config.lock_resources.len(),
        jobs = %config.jobs.join(","),
        "seqrun-host starting"
    );

    if config.run_once {
        let result = service.run_once_with_cancellation(&shutdown).await;
        return finish_startup(result).map(|_| ());
    }

    let state = HostState::new(StartupStatus::NotRun);
    if service.options().run_mode() == RunMode::BeforeServing {
        state.set_startup(StartupStatus::Running).await;
        let result = service.run_once_with_cancellation(&shutdown).await;
        state.set_startup(StartupStatus::from_result(&result)).await;
        if !finish_startup(result)? {
            return Ok(());
        }
    }

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "seqrun-host listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|error| AppError::Internal(format!("host server error: {error}")))
}

/// Logs the startup outcome. Returns false when the run was cancelled by shutdown.
fn finish_startup(result: RunResult) -> Result<bool, AppError> {
    match result {
        Ok(report) => {
            info!(
                resource = %report.resource_name,
                jobs_run = report.jobs_run.len(),
                "startup jobs completed"
            );
            Ok(true)
        }
        Err(RunError::Cancelled { stage }) => {
            info!(stage = stage.as_str(), "startup run cancelled by shutdown");
            Ok(false)
        }
        Err(error) => Err(AppError::Internal(format!(
            "startup run failed during {}: {error}",
            error.stage().as_str()
        ))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, starting graceful shutdown");
        }
    }
}
