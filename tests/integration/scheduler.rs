//! Integration tests for the sync scheduler actor

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use monitor_sync::{
    actors::{SchedulerStatus, SyncHandle},
    storage::EntityStore,
    sync::SyncError,
};
use tokio::time::timeout;

use crate::helpers::{POPULATED_RECORDS, open_store, orchestrator, populated_source};

/// Poll until the scheduler reports no run in progress
async fn wait_until_idle(handle: &SyncHandle) -> SchedulerStatus {
    loop {
        let status = handle.status().await.unwrap();
        if !status.running {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_sync_now_runs_pipeline() {
    let (_dir, store) = open_store().await;
    let sync = Arc::new(orchestrator(populated_source(), store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(3600), false);

    let report = handle.sync_now().await.unwrap();
    assert_eq!(report.hosts, 2);
    assert_eq!(report.records_appended, POPULATED_RECORDS);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scheduled_runs_fire_on_interval() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    let sync = Arc::new(orchestrator(source.clone(), store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(1), false);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.runs, 1);
    assert_eq!(status.failures, 0);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_direct_run_during_scheduled_run_is_refused() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(100)));
    let sync = Arc::new(orchestrator(source, store));

    let handle = SyncHandle::spawn(sync.clone(), Duration::from_secs(3600), true);

    // let the first scheduled run start
    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = sync.run_sync().await;
    assert!(matches!(result, Err(SyncError::AlreadyRunning)));

    let status = wait_until_idle(&handle).await;
    assert_eq!(status.runs, 1);
    assert!(status.last_report.is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failures_do_not_stop_the_scheduler() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.fail_history_for(Some("23296"));
    let sync = Arc::new(orchestrator(source.clone(), store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(3600), false);

    assert!(handle.sync_now().await.is_err());

    source.fail_history_for(None);
    handle.sync_now().await.unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.runs, 2);
    assert_eq!(status.failures, 1);
    assert!(status.last_error.is_some());
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_is_served_during_a_run() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(300)));
    let sync = Arc::new(orchestrator(source, store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(3600), false);

    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.sync_now().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = timeout(Duration::from_millis(100), handle.status())
        .await
        .expect("status must not wait for the run")
        .unwrap();
    assert!(status.running);
    assert_eq!(status.runs, 1);
    assert!(status.last_report.is_none());

    let report = pending.await.unwrap().unwrap();
    assert_eq!(report.records_appended, POPULATED_RECORDS);

    let status = handle.status().await.unwrap();
    assert!(!status.running);
    assert_eq!(status.last_report, Some(report));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sync_now_during_a_run_is_refused() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(100)));
    let sync = Arc::new(orchestrator(source.clone(), store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(3600), true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = timeout(Duration::from_millis(100), handle.sync_now())
        .await
        .expect("refusal must not wait for the run")
        .unwrap_err();
    assert_matches!(err.downcast_ref::<SyncError>(), Some(SyncError::AlreadyRunning));

    // the refusal is not counted as a run
    let status = wait_until_idle(&handle).await;
    assert_eq!(status.runs, 1);
    assert_eq!(status.failures, 0);
    assert_eq!(source.auth_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_the_run_in_flight() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(50)));
    let sync = Arc::new(orchestrator(source, store.clone()));

    let handle = SyncHandle::spawn(sync, Duration::from_secs(3600), true);
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.shutdown().await.unwrap();

    // the actor drops its receiver only after the run has committed
    while handle.status().await.is_ok() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
}
