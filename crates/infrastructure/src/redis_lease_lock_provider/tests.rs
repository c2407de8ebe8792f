use std::time::Duration;

use seqrun_application::{AcquireOutcome, LockProvider};
use seqrun_domain::AcquireTiming;

use super::RedisLeaseLockProvider;

fn timing(timeout_ms: u64, poll_ms: u64) -> AcquireTiming {
    let timing = AcquireTiming::new(
        Duration::from_millis(timeout_ms),
        Duration::from_millis(poll_ms),
    );
    assert!(timing.is_ok());
    timing.unwrap_or_else(|_| unreachable!())
}

fn test_provider(key: &str, lease_seconds: u32) -> Option<RedisLeaseLockProvider> {
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        return None;
    };

    match RedisLeaseLockProvider::new(redis_url.as_str(), key, lease_seconds) {
        Ok(provider) => Some(provider),
        Err(error) => panic!("failed to build redis lock provider in test: {error}"),
    }
}

fn unique_key(prefix: &str) -> String {
    format!("seqrun:test:{prefix}:{}", uuid::Uuid::new_v4())
}

#[test]
fn short_lease_is_rejected() {
    assert!(RedisLeaseLockProvider::new("redis://127.0.0.1:6379", "startup", 2).is_err());
}

#[test]
fn resource_name_uses_key() {
    let provider = RedisLeaseLockProvider::new("redis://127.0.0.1:6379", "startup", 30);
    assert!(provider.is_ok());
    let provider = provider.unwrap_or_else(|_| unreachable!());

    assert_eq!(provider.resource_name(), "Redis key [startup]");
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    let provider = RedisLeaseLockProvider::new("redis://127.0.0.1:1", "startup", 30);
    assert!(provider.is_ok());
    let provider = provider.unwrap_or_else(|_| unreachable!());

    let outcome = provider.try_acquire(timing(2_000, 50)).await;

    assert!(matches!(outcome, AcquireOutcome::Unavailable { .. }));
}

#[tokio::test]
async fn second_holder_times_out_until_release() {
    let key = unique_key("contended");
    let Some(first) = test_provider(key.as_str(), 30) else {
        return;
    };
    let Some(second) = test_provider(key.as_str(), 30) else {
        return;
    };

    let held = first.try_acquire(timing(2_000, 50)).await;
    let AcquireOutcome::Acquired(handle) = held else {
        panic!("expected first acquisition to succeed, got {held:?}");
    };

    let contended = second.try_acquire(timing(200, 50)).await;
    assert!(matches!(contended, AcquireOutcome::TimedOut));

    assert!(first.release(handle).await.is_ok());
    let after_release = second.try_acquire(timing(2_000, 50)).await;
    let AcquireOutcome::Acquired(handle) = after_release else {
        panic!("expected acquisition after release, got {after_release:?}");
    };
    assert!(second.release(handle).await.is_ok());
}

#[tokio::test]
async fn lease_is_renewed_while_held() {
    let key = unique_key("renewed");
    let Some(first) = test_provider(key.as_str(), 3) else {
        return;
    };
    let Some(second) = test_provider(key.as_str(), 3) else {
        return;
    };

    let held = first.try_acquire(timing(2_000, 50)).await;
    let AcquireOutcome::Acquired(handle) = held else {
        panic!("expected first acquisition to succeed, got {held:?}");
    };

    tokio::time::sleep(Duration::from_secs(4)).await;
    let contended = second.try_acquire(timing(200, 50)).await;
    assert!(matches!(contended, AcquireOutcome::TimedOut));

    assert!(first.release(handle).await.is_ok());
}

#[tokio::test]
async fn dropped_handle_lets_lease_expire() {
    let key = unique_key("dropped");
    let Some(first) = test_provider(key.as_str(), 3) else {
        return;
    };
    let Some(second) = test_provider(key.as_str(), 3) else {
        return;
    };

    let held = first.try_acquire(timing(2_000, 50)).await;
    let AcquireOutcome::Acquired(handle) = held else {
        panic!("expected first acquisition to succeed, got {held:?}");
    };
    drop(handle);

    let after_expiry = second.try_acquire(timing(6_000, 200)).await;
    let AcquireOutcome::Acquired(handle) = after_expiry else {
        panic!("expected acquisition after lease expiry, got {after_expiry:?}");
    };
    assert!(second.release(handle).await.is_ok());
}
