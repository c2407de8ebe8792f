use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use seqrun_application::{AcquireOutcome, HeldLock, LockHandle, LockProvider};
use seqrun_core::{AppError, AppResult};
use seqrun_domain::{AcquireTiming, lock_file_path};

use crate::lock_polling::PollSchedule;

/// Exclusive advisory lock on a file inside a shared directory.
///
/// Only processes that see the same filesystem or volume are excluded from each
/// other. Instances on separate machines without a shared mount each get their
/// own lock. The lock file is created on first use and never deleted.
#[derive(Debug, Clone)]
pub struct FileSystemLockProvider {
    directory: PathBuf,
    lock_path: PathBuf,
}

impl FileSystemLockProvider {
    /// Creates a provider locking `<directory>/<file_name>`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, file_name: &str) -> Self {
        let directory = directory.into();
        let lock_path = lock_file_path(directory.as_path(), file_name);
        Self {
            directory,
            lock_path,
        }
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    async fn open_lock_file(&self) -> Result<File, String> {
        match tokio::fs::metadata(&self.directory).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(format!(
                    "lock directory '{}' is not a directory",
                    self.directory.display()
                ));
            }
            Err(error) => {
                return Err(format!(
                    "lock directory '{}' is not accessible: {error}",
                    self.directory.display()
                ));
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .await
            .map_err(|error| {
                format!(
                    "failed to open lock file '{}': {error}",
                    self.lock_path.display()
                )
            })?;

        Ok(file.into_std().await)
    }
}

#[async_trait]
impl LockProvider for FileSystemLockProvider {
    fn resource_name(&self) -> String {
        format!("file system directory [{}]", self.directory.display())
    }

    async fn try_acquire(&self, timing: AcquireTiming) -> AcquireOutcome {
        let schedule = PollSchedule::start(timing);
        let file = match self.open_lock_file().await {
            Ok(file) => file,
            Err(reason) => return AcquireOutcome::Unavailable { reason },
        };

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    return AcquireOutcome::Acquired(LockHandle::new(
                        self.resource_name(),
                        FileSystemHeldLock {
                            file,
                            lock_path: self.lock_path.clone(),
                        },
                    ));
                }
                Err(error) if is_contended(&error) => {}
                Err(error) => {
                    return AcquireOutcome::Unavailable {
                        reason: format!(
                            "failed to lock '{}': {error}",
                            self.lock_path.display()
                        ),
                    };
                }
            }

            if !schedule.wait_for_next_attempt().await {
                return AcquireOutcome::TimedOut;
            }
        }
    }
}

fn is_contended(error: &std::io::Error) -> bool {
    error.kind() == ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

struct FileSystemHeldLock {
    file: File,
    lock_path: PathBuf,
}

#[async_trait]
impl HeldLock for FileSystemHeldLock {
    async fn release(self: Box<Self>) -> AppResult<()> {
        FileExt::unlock(&self.file).map_err(|error| {
            AppError::Internal(format!(
                "failed to unlock '{}': {error}",
                self.lock_path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests;
