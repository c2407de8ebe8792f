use std::sync::Arc;
use std::time::Duration;

use seqrun_application::{
    AcquireOutcome, FnStartupJob, LockAndRunService, LockProvider, RunOptions, StartupJob,
};
use seqrun_domain::{AcquireTiming, LockResourceConfig};
use tempfile::TempDir;
use tokio::sync::Mutex;

use super::FileSystemLockProvider;
use crate::{BackendLockProviderFactory, InMemoryRunEventSink};

fn timing(timeout_ms: u64, poll_ms: u64) -> AcquireTiming {
    let timing = AcquireTiming::new(
        Duration::from_millis(timeout_ms),
        Duration::from_millis(poll_ms),
    );
    assert!(timing.is_ok());
    timing.unwrap_or_else(|_| unreachable!())
}

fn temp_dir() -> TempDir {
    let dir = TempDir::new();
    assert!(dir.is_ok());
    dir.unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn acquire_and_release_creates_lock_file() {
    let dir = temp_dir();
    let provider = FileSystemLockProvider::new(dir.path(), "seqrun.lock");

    let outcome = provider.try_acquire(timing(500, 20)).await;
    let AcquireOutcome::Acquired(handle) = outcome else {
        panic!("expected acquisition, got {outcome:?}");
    };

    assert!(provider.lock_path().exists());
    assert_eq!(
        handle.resource_name(),
        format!("file system directory [{}]", dir.path().display())
    );
    assert!(provider.release(handle).await.is_ok());
    assert!(provider.lock_path().exists());
}

#[tokio::test]
async fn held_lock_makes_second_caller_time_out() {
    let dir = temp_dir();
    let first = FileSystemLockProvider::new(dir.path(), "seqrun.lock");
    let second = FileSystemLockProvider::new(dir.path(), "seqrun.lock");

    let outcome = first.try_acquire(timing(500, 20)).await;
    let AcquireOutcome::Acquired(handle) = outcome else {
        panic!("expected acquisition, got {outcome:?}");
    };

    let contended = second.try_acquire(timing(100, 20)).await;
    assert!(matches!(contended, AcquireOutcome::TimedOut));

    assert!(first.release(handle).await.is_ok());
    let after_release = second.try_acquire(timing(500, 20)).await;
    assert!(matches!(after_release, AcquireOutcome::Acquired(_)));
}

#[tokio::test]
async fn dropped_handle_frees_the_lock() {
    let dir = temp_dir();
    let provider = FileSystemLockProvider::new(dir.path(), "seqrun.lock");

    let outcome = provider.try_acquire(timing(500, 20)).await;
    let AcquireOutcome::Acquired(handle) = outcome else {
        panic!("expected acquisition, got {outcome:?}");
    };
    drop(handle);

    let again = provider.try_acquire(timing(500, 20)).await;
    assert!(matches!(again, AcquireOutcome::Acquired(_)));
}

#[tokio::test]
async fn missing_directory_is_unavailable() {
    let dir = temp_dir();
    let missing = dir.path().join("not-mounted");
    let provider = FileSystemLockProvider::new(&missing, "seqrun.lock");

    let outcome = provider.try_acquire(timing(200, 20)).await;

    assert!(matches!(outcome, AcquireOutcome::Unavailable { .. }));
    assert!(!missing.exists());
}

#[tokio::test]
async fn concurrent_runs_share_the_directory_without_overlap() {
    let dir = temp_dir();
    let resource = LockResourceConfig::file_system(dir.path());
    assert!(resource.is_ok());
    let resource = resource.unwrap_or_else(|_| unreachable!());
    let record: Arc<Mutex<Vec<(String, chrono::DateTime<chrono::Utc>)>>> =
        Arc::new(Mutex::new(Vec::new()));

    let timestamp_job = |name: &'static str| -> Arc<dyn StartupJob> {
        let record = record.clone();
        Arc::new(FnStartupJob::new(name, move || {
            let record = record.clone();
            async move {
                record.lock().await.push((name.to_owned(), chrono::Utc::now()));
                tokio::time::sleep(Duration::from_millis(30)).await;
                record.lock().await.push((name.to_owned(), chrono::Utc::now()));
                Ok(())
            }
        }))
    };

    let build = |job: Arc<dyn StartupJob>| {
        let mut options = RunOptions::new().with_timing(timing(5_000, 10));
        options.add_lock_resource(resource.clone()).register_job(job);
        LockAndRunService::new(
            options,
            Arc::new(BackendLockProviderFactory::new()),
            Arc::new(InMemoryRunEventSink::new()),
        )
    };
    let instance_a = build(timestamp_job("instance_a"));
    let instance_b = build(timestamp_job("instance_b"));

    let (first, second) = tokio::join!(instance_a.run_once(), instance_b.run_once());

    assert!(first.is_ok());
    assert!(second.is_ok());
    let record = record.lock().await.clone();
    assert_eq!(record.len(), 4);
    assert_eq!(record[0].0, record[1].0);
    assert_eq!(record[2].0, record[3].0);
    assert_ne!(record[0].0, record[2].0);
    assert!(record[1].1 <= record[2].1);
}
