use std::sync::Arc;
use std::time::Instant;

use seqrun_domain::FallbackPolicy;
use tokio_util::sync::CancellationToken;

use super::LockAndRunService;
use crate::lock_ports::{AcquireOutcome, LockHandle, LockProvider};
use crate::run_events::RunEvent;
use crate::run_result::{RunError, RunStage};

impl LockAndRunService {
    pub(super) async fn acquire_first_available(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Arc<dyn LockProvider>, LockHandle), RunError> {
        let timing = self.options.timing();
        let mut tried: Vec<String> = Vec::new();
        let mut last_timed_out: Option<String> = None;

        for (index, resource) in self.options.lock_resources().iter().enumerate() {
            let provider = match self.provider_factory.provider_for(resource) {
                Ok(provider) => provider,
                Err(error) => {
                    let resource_name = resource.describe();
                    self.event_sink.record(RunEvent::ResourceUnavailable {
                        resource_name: resource_name.clone(),
                        reason: error.to_string(),
                    });
                    tried.push(resource_name);
                    continue;
                }
            };

            let resource_name = provider.resource_name();
            self.event_sink.record(RunEvent::ResourceTrial {
                resource_name: resource_name.clone(),
                position: index + 1,
            });

            let wait_started = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(RunError::Cancelled {
                        stage: RunStage::LockAcquisition,
                    });
                }
                outcome = provider.try_acquire(timing) => outcome,
            };

            match outcome {
                AcquireOutcome::Acquired(handle) => {
                    self.event_sink.record(RunEvent::LockAcquired {
                        resource_name,
                        waited: wait_started.elapsed(),
                    });
                    return Ok((provider, handle));
                }
                AcquireOutcome::Unavailable { reason } => {
                    self.event_sink.record(RunEvent::ResourceUnavailable {
                        resource_name: resource_name.clone(),
                        reason,
                    });
                    tried.push(resource_name);
                }
                AcquireOutcome::TimedOut => {
                    self.event_sink.record(RunEvent::LockTimedOut {
                        resource_name: resource_name.clone(),
                        timeout: timing.timeout(),
                    });
                    if self.options.fallback_policy() == FallbackPolicy::StopOnTimeout {
                        return Err(RunError::LockTimedOut {
                            resource_name,
                            timeout: timing.timeout(),
                        });
                    }

                    tried.push(resource_name.clone());
                    last_timed_out = Some(resource_name);
                }
            }
        }

        if let Some(resource_name) = last_timed_out {
            return Err(RunError::LockTimedOut {
                resource_name,
                timeout: timing.timeout(),
            });
        }

        Err(RunError::NoResourceAvailable { tried })
    }

    pub(super) async fn release_lock(&self, provider: &dyn LockProvider, handle: LockHandle) {
        let resource_name = handle.resource_name().to_owned();
        match provider.release(handle).await {
            Ok(()) => self
                .event_sink
                .record(RunEvent::LockReleased { resource_name }),
            Err(error) => self.event_sink.record(RunEvent::LockReleaseFailed {
                resource_name,
                error: error.to_string(),
            }),
        }
    }
}
