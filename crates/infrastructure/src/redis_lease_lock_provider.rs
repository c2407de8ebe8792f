//! Redis-backed lease lock for startup runs.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::MultiplexedConnection;
use seqrun_application::{AcquireOutcome, HeldLock, LockHandle, LockProvider};
use seqrun_core::{AppError, AppResult};
use seqrun_domain::AcquireTiming;
use tokio::task::JoinHandle;

use crate::lock_polling::PollSchedule;

const RELEASE_LEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

const RENEW_LEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('EXPIRE', KEYS[1], ARGV[2])
else
  return 0
end
"#;

/// Redis lease on one key, renewed in the background while held.
///
/// A crashed holder stops renewing and the key expires after `lease_seconds`.
#[derive(Clone)]
pub struct RedisLeaseLockProvider {
    client: redis::Client,
    key: String,
    lease_seconds: u32,
}

impl RedisLeaseLockProvider {
    /// Creates a provider for `key` on the server at `url`.
    pub fn new(url: &str, key: impl Into<String>, lease_seconds: u32) -> AppResult<Self> {
        if lease_seconds < 3 {
            return Err(AppError::Validation(
                "redis lock lease_seconds must be at least 3".to_owned(),
            ));
        }

        let client = redis::Client::open(url)
            .map_err(|error| AppError::Validation(format!("invalid redis lock url: {error}")))?;

        Ok(Self {
            client,
            key: key.into(),
            lease_seconds,
        })
    }

    async fn try_set_lease(
        &self,
        connection: &mut MultiplexedConnection,
        token: &str,
    ) -> AppResult<bool> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key.as_str())
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(i64::from(self.lease_seconds))
            .query_async(connection)
            .await
            .map_err(|error| AppError::Internal(format!("failed to acquire redis lease: {error}")))?;

        Ok(reply.is_some())
    }

    fn spawn_renewal(&self, connection: MultiplexedConnection, token: String) -> RenewalTask {
        let key = self.key.clone();
        let lease_seconds = self.lease_seconds;
        let period = Duration::from_secs(u64::from(lease_seconds)) / 3;

        RenewalTask(tokio::spawn(async move {
            let mut connection = connection;
            let script = Script::new(RENEW_LEASE_SCRIPT);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let renewed = script
                    .key(key.as_str())
                    .arg(token.as_str())
                    .arg(i64::from(lease_seconds))
                    .invoke_async::<i32>(&mut connection)
                    .await;
                match renewed {
                    Ok(renewed) if renewed > 0 => {}
                    Ok(_) => {
                        tracing::warn!(key = %key, "redis lease was lost before release");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(key = %key, error = %error, "failed to renew redis lease");
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl LockProvider for RedisLeaseLockProvider {
    fn resource_name(&self) -> String {
        format!("Redis key [{}]", self.key)
    }

    async fn try_acquire(&self, timing: AcquireTiming) -> AcquireOutcome {
        let schedule = PollSchedule::start(timing);
        let connect = tokio::time::timeout(
            schedule.remaining(),
            self.client.get_multiplexed_async_connection(),
        )
        .await;
        let mut connection = match connect {
            Ok(Ok(connection)) => connection,
            Ok(Err(error)) => {
                return AcquireOutcome::Unavailable {
                    reason: format!("failed to connect to redis: {error}"),
                };
            }
            Err(_) => {
                return AcquireOutcome::Unavailable {
                    reason: "timed out connecting to redis".to_owned(),
                };
            }
        };

        let token = uuid::Uuid::new_v4().to_string();
        loop {
            match self.try_set_lease(&mut connection, token.as_str()).await {
                Ok(true) => {
                    let renewal = self.spawn_renewal(connection.clone(), token.clone());
                    return AcquireOutcome::Acquired(LockHandle::new(
                        self.resource_name(),
                        RedisHeldLease {
                            connection,
                            key: self.key.clone(),
                            token,
                            renewal,
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
                return AcquireOutcome::TimedOut;
            }
        }
    }
}

/// Aborts lease renewal when dropped, letting the lease expire.
struct RenewalTask(JoinHandle<()>);

impl Drop for RenewalTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct RedisHeldLease {
    connection: MultiplexedConnection,
    key: String,
    token: String,
    renewal: RenewalTask,
}

#[async_trait]
impl HeldLock for RedisHeldLease {
    async fn release(self: Box<Self>) -> AppResult<()> {
        let Self {
            mut connection,
            key,
            token,
            renewal,
        } = *self;
        drop(renewal);

        let deleted = Script::new(RELEASE_LEASE_SCRIPT)
            .key(key.as_str())
            .arg(token.as_str())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| AppError::Internal(format!("failed to release redis lease: {error}")))?;
        if deleted == 0 {
            tracing::warn!(key = %key, "redis lease had already expired at release");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
