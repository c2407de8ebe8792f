use std::time::Instant;

use super::LockAndRunService;
use crate::run_events::RunEvent;
use crate::run_result::RunError;

impl LockAndRunService {
    /// Runs every job in registration order, stopping at the first failure.
    pub(super) async fn execute_jobs(&self) -> Result<Vec<String>, RunError> {
        let jobs = self.options.jobs();
        let total = jobs.len();
        let mut completed = Vec::with_capacity(total);

        for descriptor in jobs.iter() {
            let job_name = descriptor.name().to_owned();
            let position = descriptor.position();
            self.event_sink.record(RunEvent::JobStarted {
                job_name: job_name.clone(),
                position,
                total,
            });

            let started = Instant::now();
            if let Err(error) = descriptor.job().run().await {
                self.event_sink.record(RunEvent::JobFailed {
                    job_name: job_name.clone(),
                    position,
                    error: error.to_string(),
                });
                return Err(RunError::JobExecutionFailed {
                    job_name,
                    position,
                    source: error,
                });
            }

            self.event_sink.record(RunEvent::JobCompleted {
                job_name: job_name.clone(),
                position,
                elapsed: started.elapsed(),
            });
            completed.push(job_name);
        }

        Ok(completed)
    }
}
