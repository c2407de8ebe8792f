use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use seqrun_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Lock file name used when a file system resource does not name one.
pub const DEFAULT_LOCK_FILE_NAME: &str = "seqrun.lock";

/// Lock name used when a database or Redis resource does not name one.
pub const DEFAULT_LOCK_NAME: &str = "seqrun-startup";

/// Redis lease duration used when none is configured.
pub const DEFAULT_REDIS_LEASE_SECONDS: u32 = 30;

/// Supported lock backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockBackendKind {
    /// PostgreSQL session-scoped advisory lock.
    Postgres,
    /// Advisory lock on a file in a shared directory.
    FileSystem,
    /// Redis key lease.
    Redis,
}

impl LockBackendKind {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::FileSystem => "filesystem",
            Self::Redis => "redis",
        }
    }
}

impl Display for LockBackendKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LockBackendKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "postgres" => Ok(Self::Postgres),
            "filesystem" => Ok(Self::FileSystem),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::Validation(format!(
                "unknown lock backend '{other}', expected one of 'postgres', 'filesystem' or 'redis'"
            ))),
        }
    }
}

/// Backend-specific descriptor of one candidate lock resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockBackend {
    /// Advisory lock held on one PostgreSQL session.
    Postgres {
        /// Connection string of the database that arbitrates the lock.
        connection_string: NonEmptyString,
        /// Name the advisory lock key is derived from.
        lock_name: NonEmptyString,
    },
    /// Exclusive lock on `directory/file_name`.
    ///
    /// Only excludes processes that share the same file system or volume.
    FileSystem {
        /// Existing directory shared by every instance.
        directory: PathBuf,
        /// Lock file created inside `directory`.
        file_name: NonEmptyString,
    },
    /// Lease on one Redis key.
    Redis {
        /// Redis connection URL.
        url: NonEmptyString,
        /// Key that holds the lease token.
        key: NonEmptyString,
        /// Lease time-to-live, renewed while the lock is held.
        lease_seconds: u32,
    },
}

/// One candidate lock resource in trial order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockResourceConfig {
    backend: LockBackend,
}

impl LockResourceConfig {
    /// Creates a PostgreSQL advisory lock resource.
    pub fn postgres(
        connection_string: impl Into<String>,
        lock_name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            backend: LockBackend::Postgres {
                connection_string: NonEmptyString::new(connection_string).map_err(|_| {
                    AppError::Validation(
                        "postgres lock connection string must not be empty".to_owned(),
                    )
                })?,
                lock_name: NonEmptyString::new(lock_name).map_err(|_| {
                    AppError::Validation("postgres lock name must not be empty".to_owned())
                })?,
            },
        })
    }

    /// Creates a file system lock resource using the default lock file name.
    pub fn file_system(directory: impl Into<PathBuf>) -> AppResult<Self> {
        Self::file_system_with_file_name(directory, DEFAULT_LOCK_FILE_NAME)
    }

    /// Creates a file system lock resource with an explicit lock file name.
    pub fn file_system_with_file_name(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> AppResult<Self> {
        let directory = directory.into();
        if directory.as_os_str().is_empty() {
            return Err(AppError::Validation(
                "file system lock directory must not be empty".to_owned(),
            ));
        }

        let file_name = NonEmptyString::new(file_name).map_err(|_| {
            AppError::Validation("file system lock file name must not be empty".to_owned())
        })?;
        if file_name.as_str().contains(['/', '\\']) {
            return Err(AppError::Validation(format!(
                "file system lock file name '{}' must not contain path separators",
                file_name.as_str()
            )));
        }

        Ok(Self {
            backend: LockBackend::FileSystem {
                directory,
                file_name,
            },
        })
    }

    /// Creates a Redis lease lock resource.
    pub fn redis(
        url: impl Into<String>,
        key: impl Into<String>,
        lease_seconds: u32,
    ) -> AppResult<Self> {
        if lease_seconds < 3 {
            return Err(AppError::Validation(
                "redis lock lease_seconds must be at least 3".to_owned(),
            ));
        }

        Ok(Self {
            backend: LockBackend::Redis {
                url: NonEmptyString::new(url).map_err(|_| {
                    AppError::Validation("redis lock url must not be empty".to_owned())
                })?,
                key: NonEmptyString::new(key).map_err(|_| {
                    AppError::Validation("redis lock key must not be empty".to_owned())
                })?,
                lease_seconds,
            },
        })
    }

    /// Returns the backend descriptor.
    #[must_use]
    pub fn backend(&self) -> &LockBackend {
        &self.backend
    }

    /// Returns the backend family.
    #[must_use]
    pub fn kind(&self) -> LockBackendKind {
        match self.backend {
            LockBackend::Postgres { .. } => LockBackendKind::Postgres,
            LockBackend::FileSystem { .. } => LockBackendKind::FileSystem,
            LockBackend::Redis { .. } => LockBackendKind::Redis,
        }
    }

    /// Returns a short description that never includes credentials.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.backend {
            LockBackend::Postgres { lock_name, .. } => {
                format!("postgres lock '{}'", lock_name.as_str())
            }
            LockBackend::FileSystem {
                directory,
                file_name,
            } => format!(
                "filesystem lock '{}'",
                lock_file_path(directory, file_name.as_str()).display()
            ),
            LockBackend::Redis { key, .. } => format!("redis lock '{}'", key.as_str()),
        }
    }
}

/// Joins a lock directory and lock file name.
#[must_use]
pub fn lock_file_path(directory: &Path, file_name: &str) -> PathBuf {
    directory.join(file_name)
}
