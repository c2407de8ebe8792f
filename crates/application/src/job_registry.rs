use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::job_ports::StartupJob;
use crate::run_result::RunError;

/// Registered job with its execution position.
#[derive(Clone)]
pub struct JobDescriptor {
    name: String,
    position: usize,
    job: Arc<dyn StartupJob>,
}

impl JobDescriptor {
    /// Returns the job identity.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the 1-based registration position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the job.
    #[must_use]
    pub fn job(&self) -> &Arc<dyn StartupJob> {
        &self.job
    }
}

impl Debug for JobDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JobDescriptor")
            .field("name", &self.name)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Ordered startup jobs. Insertion order is execution order.
#[derive(Clone, Default)]
pub struct JobRegistry {
    descriptors: Vec<JobDescriptor>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job. Duplicate identities are reported by [`JobRegistry::validate`].
    pub fn register(&mut self, job: Arc<dyn StartupJob>) -> &mut Self {
        let position = self.descriptors.len() + 1;
        self.descriptors.push(JobDescriptor {
            name: job.name().to_owned(),
            position,
            job,
        });
        self
    }

    /// Appends a job, rejecting a blank or already registered identity immediately.
    pub fn try_register(&mut self, job: Arc<dyn StartupJob>) -> Result<&mut Self, RunError> {
        let name = job.name();
        if name.trim().is_empty() {
            return Err(blank_name_error(self.descriptors.len() + 1));
        }

        if self.contains(name) {
            return Err(RunError::DuplicateJob {
                names: vec![name.to_owned()],
            });
        }

        Ok(self.register(job))
    }

    /// Returns true when a job with `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors
            .iter()
            .any(|descriptor| descriptor.name == name)
    }

    /// Returns the number of registered jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true when no job is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterates jobs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.descriptors.iter()
    }

    /// Returns job identities in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.name.as_str())
            .collect()
    }

    /// Returns each identity registered more than once, in order of first registration.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for descriptor in &self.descriptors {
            *counts.entry(descriptor.name.as_str()).or_default() += 1;
        }

        let mut duplicates: Vec<String> = Vec::new();
        for descriptor in &self.descriptors {
            let name = descriptor.name.as_str();
            if counts.get(name).copied().unwrap_or_default() > 1
                && !duplicates.iter().any(|seen| seen == name)
            {
                duplicates.push(name.to_owned());
            }
        }

        duplicates
    }

    /// Checks that there is something to run and every identity is usable and unique.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.descriptors.is_empty() {
            return Err(RunError::NoJobsRegistered);
        }

        if let Some(descriptor) = self
            .descriptors
            .iter()
            .find(|descriptor| descriptor.name.trim().is_empty())
        {
            return Err(blank_name_error(descriptor.position));
        }

        let names = self.duplicate_names();
        if !names.is_empty() {
            return Err(RunError::DuplicateJob { names });
        }

        Ok(())
    }
}

impl Debug for JobRegistry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.debug_list().entries(self.names()).finish()
    }
}

fn blank_name_error(position: usize) -> RunError {
    RunError::InvalidConfiguration(format!(
        "startup job at position {position} has an empty name"
    ))
}
