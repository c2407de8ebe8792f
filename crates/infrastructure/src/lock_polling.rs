use std::time::Duration;

use seqrun_domain::AcquireTiming;
use tokio::time::Instant;

/// Deadline-bounded retry schedule shared by the lock providers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollSchedule {
    deadline: Instant,
    poll_interval: Duration,
}

impl PollSchedule {
    pub(crate) fn start(timing: AcquireTiming) -> Self {
        Self {
            deadline: Instant::now() + timing.timeout(),
            poll_interval: timing.poll_interval(),
        }
    }

    /// Time left before the deadline.
    pub(crate) fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleeps until the next attempt. Returns false once the deadline has passed.
    ///
    /// The last sleep is clamped to the deadline so one final attempt happens at
    /// the deadline itself.
    pub(crate) async fn wait_for_next_attempt(&self) -> bool {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return false;
        }

        tokio::time::sleep(self.poll_interval.min(remaining)).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use seqrun_domain::AcquireTiming;

    use super::PollSchedule;

    fn timing(timeout_ms: u64, poll_ms: u64) -> AcquireTiming {
        let timing = AcquireTiming::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_ms),
        );
        assert!(timing.is_ok());
        timing.unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn schedule_stops_after_deadline() {
        let schedule = PollSchedule::start(timing(30, 10));
        let mut attempts = 1;
        while schedule.wait_for_next_attempt().await {
            attempts += 1;
        }

        assert!(attempts >= 2);
        assert!(attempts <= 5);
        assert!(schedule.remaining().is_zero());
    }

    #[tokio::test]
    async fn last_wait_is_clamped_to_deadline() {
        let started = std::time::Instant::now();
        let schedule = PollSchedule::start(timing(20, 20));
        while schedule.wait_for_next_attempt().await {}

        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
