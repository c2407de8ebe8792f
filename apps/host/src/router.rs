use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use seqrun_application::{RunError, RunReport};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Last known outcome of the startup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartupStatus {
    NotRun,
    Running,
    Completed {
        report: RunReport,
    },
    Failed {
        stage: &'static str,
        message: String,
        retryable: bool,
        failed_at: DateTime<Utc>,
    },
}

impl StartupStatus {
    pub fn from_result(result: &Result<RunReport, RunError>) -> Self {
        match result {
            Ok(report) => Self::Completed {
                report: report.clone(),
            },
            Err(error) => Self::Failed {
                stage: error.stage().as_str(),
                message: error.to_string(),
                retryable: error.is_retryable(),
                failed_at: Utc::now(),
            },
        }
    }
}

#[derive(Clone)]
pub struct HostState {
    startup: Arc<RwLock<StartupStatus>>,
}

impl HostState {
    pub fn new(status: StartupStatus) -> Self {
        Self {
            startup: Arc::new(RwLock::new(status)),
        }
    }

    pub async fn set_startup(&self, status: StartupStatus) {
        *self.startup.write().await = status;
    }

    pub async fn startup(&self) -> StartupStatus {
        self.startup.read().await.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn build_router(state: HostState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/startup", get(startup_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn startup_handler(State(state): State<HostState>) -> Json<StartupStatus> {
    Json(state.startup().await)
}
