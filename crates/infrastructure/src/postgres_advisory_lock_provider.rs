use std::str::FromStr;

use async_trait::async_trait;
use seqrun_application::{AcquireOutcome, HeldLock, LockHandle, LockProvider};
use seqrun_core::{AppError, AppResult};
use seqrun_domain::AcquireTiming;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use url::Url;

use crate::lock_polling::PollSchedule;

/// Session-scoped PostgreSQL advisory lock.
///
/// The lock lives on one dedicated connection, so a crashed holder releases it
/// as soon as the server notices the closed session.
#[derive(Clone)]
pub struct PostgresAdvisoryLockProvider {
    connect_options: PgConnectOptions,
    database_name: String,
    lock_key: i64,
}

impl PostgresAdvisoryLockProvider {
    /// Creates a provider for `connection_string`, locking the key derived from `lock_name`.
    pub fn new(connection_string: &str, lock_name: &str) -> AppResult<Self> {
        let connect_options = PgConnectOptions::from_str(connection_string).map_err(|error| {
            AppError::Validation(format!("invalid postgres lock connection string: {error}"))
        })?;

        Ok(Self {
            connect_options,
            database_name: database_name(connection_string),
            lock_key: advisory_lock_key(lock_name),
        })
    }

    /// Returns the 64-bit advisory lock key.
    #[must_use]
    pub fn lock_key(&self) -> i64 {
        self.lock_key
    }

    async fn try_lock(&self, connection: &mut PgConnection) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
            .bind(self.lock_key)
            .fetch_one(connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to request postgres advisory lock: {error}"))
            })
    }
}

#[async_trait]
impl LockProvider for PostgresAdvisoryLockProvider {
    fn resource_name(&self) -> String {
        format!("PostgreSQL database with name [{}]", self.database_name)
    }

    async fn try_acquire(&self, timing: AcquireTiming) -> AcquireOutcome {
        let schedule = PollSchedule::start(timing);
        let connect = tokio::time::timeout(
            schedule.remaining(),
            PgConnection::connect_with(&self.connect_options),
        )
        .await;
        let mut connection = match connect {
            Ok(Ok(connection)) => connection,
            Ok(Err(error)) => {
                return AcquireOutcome::Unavailable {
                    reason: format!("failed to connect to postgres: {error}"),
                };
            }
            Err(_) => {
                return AcquireOutcome::Unavailable {
                    reason: "timed out connecting to postgres".to_owned(),
                };
            }
        };

        loop {
            match self.try_lock(&mut connection).await {
                Ok(true) => {
                    return AcquireOutcome::Acquired(LockHandle::new(
                        self.resource_name(),
                        PostgresHeldLock {
                            connection,
                            lock_key: self.lock_key,
                        },
                    ));
                }
                Ok(false) => {}
                Err(error) => {
                    return AcquireOutcome::Unavailable {
                        reason: error.to_string(),
                    };
                }
            }

            if !schedule.wait_for_next_attempt().await {
                // Nothing is held on this session.
                let _ = connection.close().await;
                return AcquireOutcome::TimedOut;
            }
        }
    }
}

struct PostgresHeldLock {
    connection: PgConnection,
    lock_key: i64,
}

#[async_trait]
impl HeldLock for PostgresHeldLock {
    async fn release(self: Box<Self>) -> AppResult<()> {
        let Self {
            mut connection,
            lock_key,
        } = *self;

        let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(lock_key)
            .fetch_one(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to release postgres advisory lock: {error}"))
            })?;
        if !unlocked {
            tracing::warn!(lock_key, "postgres advisory lock was no longer held at release");
        }

        connection.close().await.map_err(|error| {
            AppError::Internal(format!("failed to close postgres lock session: {error}"))
        })
    }
}

/// Derives the advisory lock key from the first eight bytes of SHA-256(`lock_name`).
#[must_use]
pub fn advisory_lock_key(lock_name: &str) -> i64 {
    let digest = Sha256::digest(lock_name.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

fn database_name(connection_string: &str) -> String {
    let Ok(url) = Url::parse(connection_string) else {
        return "postgres".to_owned();
    };

    let path = url.path().trim_start_matches('/');
    if !path.is_empty() {
        return path.to_owned();
    }

    if url.username().is_empty() {
        "postgres".to_owned()
    } else {
        url.username().to_owned()
    }
}
