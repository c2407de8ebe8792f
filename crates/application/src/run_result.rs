use std::time::Duration;

use chrono::{DateTime, Utc};
use seqrun_core::AppError;
use serde::Serialize;
use thiserror::Error;

/// Orchestration stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Configuration checks performed before any lock is touched.
    Validation,
    /// Walking the candidate resources and waiting for the lock.
    LockAcquisition,
    /// Running the registered jobs while holding the lock.
    JobExecution,
}

impl RunStage {
    /// Returns stable stage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::LockAcquisition => "lock_acquisition",
            Self::JobExecution => "job_execution",
        }
    }
}

/// Failure of one lock-and-run orchestration.
#[derive(Debug, Error)]
pub enum RunError {
    /// Every configured resource was unreachable, or none was configured.
    #[error("{}", no_resource_message(.tried))]
    NoResourceAvailable {
        /// Diagnostic names of the resources that were tried, in order.
        tried: Vec<String>,
    },

    /// Nothing to run while holding the lock.
    #[error("no startup jobs were registered to run while the lock is held")]
    NoJobsRegistered,

    /// Two or more jobs share an identity.
    #[error("startup jobs registered more than once: {}", .names.join(", "))]
    DuplicateJob {
        /// Each duplicated job name once, in registration order.
        names: Vec<String>,
    },

    /// Run configuration is unusable.
    #[error("invalid run configuration: {0}")]
    InvalidConfiguration(String),

    /// The resource exists and stayed held by another instance.
    #[error(
        "timed out after {}ms waiting for the lock on {resource_name}",
        .timeout.as_millis()
    )]
    LockTimedOut {
        /// Diagnostic name of the contended resource.
        resource_name: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A job returned an error; no later job ran.
    #[error("startup job '{job_name}' (position {position}) failed: {source}")]
    JobExecutionFailed {
        /// Identity of the failed job.
        job_name: String,
        /// 1-based registration position of the failed job.
        position: usize,
        /// Error returned by the job.
        #[source]
        source: AppError,
    },

    /// The caller cancelled the run.
    #[error("startup run was cancelled during {}", .stage.as_str())]
    Cancelled {
        /// Stage that was interrupted.
        stage: RunStage,
    },
}

impl RunError {
    /// Returns the stage the run failed in.
    #[must_use]
    pub fn stage(&self) -> RunStage {
        match self {
            Self::NoJobsRegistered | Self::DuplicateJob { .. } | Self::InvalidConfiguration(_) => {
                RunStage::Validation
            }
            Self::NoResourceAvailable { tried } if tried.is_empty() => RunStage::Validation,
            Self::NoResourceAvailable { .. } | Self::LockTimedOut { .. } => {
                RunStage::LockAcquisition
            }
            Self::JobExecutionFailed { .. } => RunStage::JobExecution,
            Self::Cancelled { stage } => *stage,
        }
    }

    /// Returns true when repeating the same run unchanged may succeed.
    ///
    /// Job failures are never retried automatically: a restarted process
    /// re-acquires the lock and re-runs every job from the top.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimedOut { .. })
    }
}

fn no_resource_message(tried: &[String]) -> String {
    if tried.is_empty() {
        return "no lock resources were registered; register at least one lock resource \
                before running startup jobs"
            .to_owned();
    }

    format!(
        "no resource was found to lock, so the registered startup jobs could not run (tried: {})",
        tried.join(", ")
    )
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Diagnostic name of the resource that was locked.
    pub resource_name: String,
    /// Jobs that ran, in execution order.
    pub jobs_run: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the lock was released.
    pub finished_at: DateTime<Utc>,
}

/// Terminal outcome of one orchestration.
pub type RunResult = Result<RunReport, RunError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use seqrun_core::AppError;

    use super::{RunError, RunStage};

    #[test]
    fn missing_lock_resources_is_a_validation_failure() {
        let error = RunError::NoResourceAvailable { tried: Vec::new() };

        assert_eq!(error.stage(), RunStage::Validation);
        assert!(
            error
                .to_string()
                .contains("register at least one lock resource")
        );
    }

    #[test]
    fn unreachable_resources_are_listed_in_message() {
        let error = RunError::NoResourceAvailable {
            tried: vec![
                "PostgreSQL database with name [app]".to_owned(),
                "file system directory [/srv/shared]".to_owned(),
            ],
        };

        assert_eq!(error.stage(), RunStage::LockAcquisition);
        assert!(error.to_string().starts_with("no resource was found to lock"));
        assert!(error.to_string().contains("/srv/shared"));
    }

    #[test]
    fn only_lock_timeouts_are_retryable() {
        let timed_out = RunError::LockTimedOut {
            resource_name: "Redis key [startup]".to_owned(),
            timeout: Duration::from_secs(5),
        };
        let failed_job = RunError::JobExecutionFailed {
            job_name: "seed_data".to_owned(),
            position: 2,
            source: AppError::Internal("boom".to_owned()),
        };

        assert!(timed_out.is_retryable());
        assert!(!failed_job.is_retryable());
        assert!(!RunError::NoJobsRegistered.is_retryable());
    }

    #[test]
    fn job_failure_keeps_original_cause() {
        let error = RunError::JobExecutionFailed {
            job_name: "seed_data".to_owned(),
            position: 2,
            source: AppError::Internal("constraint violated".to_owned()),
        };

        assert_eq!(error.stage(), RunStage::JobExecution);
        assert_eq!(
            error.to_string(),
            "startup job 'seed_data' (position 2) failed: internal error: constraint violated"
        );
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("internal error: constraint violated")
        );
    }
}
