use std::time::Duration;

use seqrun_core::{AppError, AppResult};

/// Default time to wait for another holder to release the lock.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between two acquisition attempts on a contended lock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Acquisition timeout and poll interval for contended locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireTiming {
    timeout: Duration,
    poll_interval: Duration,
}

impl AcquireTiming {
    /// Creates validated acquisition timing.
    pub fn new(timeout: Duration, poll_interval: Duration) -> AppResult<Self> {
        if timeout.is_zero() {
            return Err(AppError::Validation(
                "lock acquisition timeout must be greater than zero".to_owned(),
            ));
        }

        if poll_interval.is_zero() {
            return Err(AppError::Validation(
                "lock poll interval must be greater than zero".to_owned(),
            ));
        }

        if poll_interval > timeout {
            return Err(AppError::Validation(format!(
                "lock poll interval ({}ms) must not exceed the acquisition timeout ({}ms)",
                poll_interval.as_millis(),
                timeout.as_millis()
            )));
        }

        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Returns the acquisition timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the delay between acquisition attempts.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for AcquireTiming {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ACQUIRE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::AcquireTiming;

    #[test]
    fn timing_rejects_zero_timeout() {
        let timing = AcquireTiming::new(Duration::ZERO, Duration::from_millis(10));
        assert!(timing.is_err());
    }

    #[test]
    fn timing_rejects_poll_interval_longer_than_timeout() {
        let timing = AcquireTiming::new(Duration::from_secs(1), Duration::from_secs(2));
        assert!(timing.is_err());
    }

    #[test]
    fn default_timing_is_valid() {
        let timing = AcquireTiming::default();
        let rebuilt = AcquireTiming::new(timing.timeout(), timing.poll_interval());
        assert_eq!(rebuilt.ok(), Some(timing));
    }

    proptest! {
        #[test]
        fn timing_accepts_any_positive_poll_within_timeout(
            timeout_ms in 1_u64..600_000,
            ratio in 0.0_f64..=1.0,
        ) {
            let poll_ms = ((timeout_ms as f64) * ratio).max(1.0) as u64;
            let timing = AcquireTiming::new(
                Duration::from_millis(timeout_ms),
                Duration::from_millis(poll_ms.min(timeout_ms)),
            );
            prop_assert!(timing.is_ok());
        }
    }
}
