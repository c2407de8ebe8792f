use std::str::FromStr;

use seqrun_core::AppError;
use serde::{Deserialize, Serialize};

/// When the host invokes the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Run automatically at host startup, before traffic is accepted.
    #[default]
    BeforeServing,
    /// The host invokes the orchestrator explicitly.
    OnDemand,
}

impl RunMode {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeServing => "before_serving",
            Self::OnDemand => "on_demand",
        }
    }
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "before_serving" => Ok(Self::BeforeServing),
            "on_demand" => Ok(Self::OnDemand),
            other => Err(AppError::Validation(format!(
                "unknown run mode '{other}', expected 'before_serving' or 'on_demand'"
            ))),
        }
    }
}

/// What the orchestrator does when a reachable resource stays contended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fail the run with a timeout; later candidates are not tried.
    #[default]
    StopOnTimeout,
    /// Treat a timed-out resource like an unavailable one and try the next.
    TryNextOnTimeout,
}
