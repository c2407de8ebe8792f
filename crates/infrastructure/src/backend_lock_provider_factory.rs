use std::sync::Arc;

use seqrun_application::{LockProvider, LockProviderFactory};
use seqrun_core::AppResult;
use seqrun_domain::{LockBackend, LockResourceConfig};

use crate::{FileSystemLockProvider, PostgresAdvisoryLockProvider, RedisLeaseLockProvider};

/// Resolves each configured backend to its provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendLockProviderFactory;

impl BackendLockProviderFactory {
    /// Creates the factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LockProviderFactory for BackendLockProviderFactory {
    fn provider_for(&self, resource: &LockResourceConfig) -> AppResult<Arc<dyn LockProvider>> {
        let provider: Arc<dyn LockProvider> = match resource.backend() {
            LockBackend::Postgres {
                connection_string,
                lock_name,
            } => Arc::new(PostgresAdvisoryLockProvider::new(
                connection_string.as_str(),
                lock_name.as_str(),
            )?),
            LockBackend::FileSystem {
                directory,
                file_name,
            } => Arc::new(FileSystemLockProvider::new(
                directory.clone(),
                file_name.as_str(),
            )),
            LockBackend::Redis {
                url,
                key,
                lease_seconds,
            } => Arc::new(RedisLeaseLockProvider::new(
                url.as_str(),
                key.as_str(),
                *lease_seconds,
            )?),
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use seqrun_application::LockProviderFactory;
    use seqrun_domain::LockResourceConfig;

    use super::BackendLockProviderFactory;

    #[test]
    fn builds_provider_for_each_backend() {
        let factory = BackendLockProviderFactory::new();
        let resources = [
            LockResourceConfig::postgres("postgres://app@localhost:5432/orders", "startup"),
            LockResourceConfig::file_system("/srv/shared"),
            LockResourceConfig::redis("redis://127.0.0.1:6379", "startup", 30),
        ];

        let names: Vec<String> = resources
            .iter()
            .map(|resource| {
                assert!(resource.is_ok());
                let resource = resource.as_ref().unwrap_or_else(|_| unreachable!());
                let provider = factory.provider_for(resource);
                assert!(provider.is_ok());
                provider
                    .map(|provider| provider.resource_name())
                    .unwrap_or_default()
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "PostgreSQL database with name [orders]".to_owned(),
                "file system directory [/srv/shared]".to_owned(),
                "Redis key [startup]".to_owned(),
            ]
        );
    }

    #[test]
    fn malformed_redis_url_is_a_build_error() {
        let resource = LockResourceConfig::redis("not-a-redis-url", "startup", 30);
        assert!(resource.is_ok());
        let resource = resource.unwrap_or_else(|_| unreachable!());

        assert!(BackendLockProviderFactory::new().provider_for(&resource).is_err());
    }
}
