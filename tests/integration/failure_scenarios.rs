//! Integration tests for aborted runs
//!
//! Every failure must leave the store exactly as it was before the run,
//! and the next successful run must add exactly one run's worth of data.

use std::time::Duration;

use crate::helpers::{
    FailingStore, FakeSource, POPULATED_RECORDS, open_store, orchestrator, populated_source,
    view_rows,
};
use assert_matches::assert_matches;
use monitor_sync::{
    Category,
    source::{RawItem, SourceError},
    storage::{EntityStore, StorageError, StoreTotals},
    sync::{SyncError, SyncOrchestrator, SyncSettings},
};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

#[tokio::test]
async fn test_store_failure_on_last_append_rolls_back_everything() {
    let (_dir, store) = open_store().await;
    let source = populated_source();

    // 30001 is the last item synced
    let failing = FailingStore::new(store.clone(), "30001");
    let result = orchestrator(source.clone(), failing).run_sync().await;

    assert_matches!(result, Err(SyncError::Store(StorageError::QueryFailed(_))));
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());

    // retry against the healthy store
    let report = orchestrator(source, store.clone()).run_sync().await.unwrap();
    assert_eq!(report.records_appended, POPULATED_RECORDS);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
}

#[tokio::test]
async fn test_source_failure_mid_run_rolls_back() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.fail_history_for(Some("30001"));

    let result = orchestrator(source.clone(), store.clone()).run_sync().await;

    assert_matches!(result, Err(SyncError::SourceUnavailable(SourceError::Status(502))));
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());

    source.fail_history_for(None);
    orchestrator(source, store.clone()).run_sync().await.unwrap();
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
}

#[tokio::test]
async fn test_failed_run_keeps_previous_state() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    let sync = orchestrator(source.clone(), store.clone());

    sync.run_sync().await.unwrap();
    let totals = store.totals().await.unwrap();
    let view = view_rows(&store).await;

    source.add_host("10086", "new-host");
    source.fail_history_for(Some("23297"));
    assert!(sync.run_sync().await.is_err());

    assert_eq!(store.totals().await.unwrap(), totals);
    assert_eq!(view_rows(&store).await, view);
    assert_eq!(
        store.chart_data("10084", Category::Memory).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_rejected_login_touches_nothing() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.reject_login(true);

    let result = orchestrator(source.clone(), store.clone()).run_sync().await;

    assert_matches!(
        result,
        Err(SyncError::SourceUnavailable(SourceError::AuthenticationFailed(_)))
    );
    assert!(source.windows().is_empty());
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());
}

#[tokio::test]
async fn test_item_of_unknown_host_is_referential_error() {
    let (_dir, store) = open_store().await;
    let source = FakeSource::new();
    source.add_host("1", "db-01");
    source.add_item("1", "7", "Load", "system.cpu.load", "0");
    // inconsistent source data: listed under host 1 but owned by host 99
    source.add_raw_item(
        "1",
        RawItem {
            itemid: "9".to_string(),
            hostid: "99".to_string(),
            name: "Orphan".to_string(),
            key: "custom.orphan".to_string(),
            value_type: "0".to_string(),
        },
    );

    let result = orchestrator(source, store.clone()).run_sync().await;

    assert_matches!(result, Err(SyncError::Referential(msg)) if msg.contains("unknown host 99"));
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());
}

#[tokio::test]
async fn test_deadline_expiry_rolls_back() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(300)));
    let sync = orchestrator(source.clone(), store.clone());

    let result = sync
        .run_until(Instant::now() + Duration::from_millis(100))
        .await;

    assert_matches!(result, Err(SyncError::DeadlineExceeded));
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());

    // the orchestrator and store are usable afterwards
    source.delay_history(None);
    sync.run_sync().await.unwrap();
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
}

#[tokio::test]
async fn test_deadline_does_not_interrupt_commit() {
    let (_dir, store) = open_store().await;
    let source = populated_source();

    // the deadline passes while the commit is in progress
    let slow = FailingStore::slow_commit(store.clone(), Duration::from_millis(300));
    let sync = orchestrator(source, slow);

    let result = sync
        .run_until(Instant::now() + Duration::from_millis(150))
        .await;

    let report = result.unwrap();
    assert_eq!(report.records_appended, POPULATED_RECORDS);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
    assert_eq!(view_rows(&store).await.len(), POPULATED_RECORDS as usize);
}

#[tokio::test]
async fn test_configured_run_timeout_applies() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(300)));

    let settings = SyncSettings {
        run_timeout: Some(Duration::from_millis(100)),
        ..SyncSettings::default()
    };
    let sync = SyncOrchestrator::new(source, store.clone(), settings);

    assert_matches!(sync.run_sync().await, Err(SyncError::DeadlineExceeded));
    assert_eq!(store.totals().await.unwrap(), StoreTotals::default());
}

#[tokio::test]
async fn test_concurrent_run_is_refused() {
    let (_dir, store) = open_store().await;
    let source = populated_source();
    source.delay_history(Some(Duration::from_millis(50)));
    let sync = orchestrator(source.clone(), store.clone());

    let (first, second) = futures::future::join(sync.run_sync(), sync.run_sync()).await;

    assert_matches!(first, Ok(_));
    assert_matches!(second, Err(SyncError::AlreadyRunning));

    // the refused run never reached the source
    assert_eq!(source.auth_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.totals().await.unwrap().history, POPULATED_RECORDS);
}
