//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use monitor_sync::{
    Category, Feedback, HistoryRecord, Host, Item, ValueKind,
    source::{MonitoringSource, RawHost, RawItem, RawSample, SourceError, SourceResult},
    storage::{
        ChartPoint, EntityStore, HealthStatus, StorageError, StorageResult, StoreTotals,
        StoreTransaction, sqlite::SqliteStore,
    },
    sync::{SyncOrchestrator, SyncSettings},
};
use tempfile::TempDir;

pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Window requested from the source: `(item_id, from, till)`
pub type WindowCall = (String, i64, i64);

/// In-memory monitoring source with switchable failures
#[derive(Default)]
pub struct FakeSource {
    hosts: Mutex<Vec<RawHost>>,
    items: Mutex<HashMap<String, Vec<RawItem>>>,
    samples: Mutex<HashMap<String, Vec<RawSample>>>,

    /// History requests fail for this item
    failing_item: Mutex<Option<String>>,

    /// Delay added to every history request
    history_delay: Mutex<Option<Duration>>,

    login_rejected: AtomicBool,

    pub auth_calls: AtomicUsize,
    pub windows: Mutex<Vec<WindowCall>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_host(&self, id: &str, name: &str) {
        let mut hosts = self.hosts.lock().unwrap();
        hosts.retain(|h| h.hostid != id);
        hosts.push(RawHost {
            hostid: id.to_string(),
            host: name.to_string(),
        });
    }

    pub fn add_item(&self, host_id: &str, item_id: &str, name: &str, key: &str, value_type: &str) {
        self.add_raw_item(
            host_id,
            RawItem {
                itemid: item_id.to_string(),
                hostid: host_id.to_string(),
                name: name.to_string(),
                key: key.to_string(),
                value_type: value_type.to_string(),
            },
        );
    }

    /// Return `item` when the items of `listed_under` are requested
    pub fn add_raw_item(&self, listed_under: &str, item: RawItem) {
        self.items
            .lock()
            .unwrap()
            .entry(listed_under.to_string())
            .or_default()
            .push(item);
    }

    pub fn set_samples(&self, item_id: &str, samples: Vec<RawSample>) {
        self.samples
            .lock()
            .unwrap()
            .insert(item_id.to_string(), samples);
    }

    pub fn fail_history_for(&self, item_id: Option<&str>) {
        *self.failing_item.lock().unwrap() = item_id.map(str::to_string);
    }

    pub fn delay_history(&self, delay: Option<Duration>) {
        *self.history_delay.lock().unwrap() = delay;
    }

    pub fn reject_login(&self, rejected: bool) {
        self.login_rejected.store(rejected, Ordering::SeqCst);
    }

    pub fn windows(&self) -> Vec<WindowCall> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitoringSource for FakeSource {
    async fn authenticate(&self) -> SourceResult<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.login_rejected.load(Ordering::SeqCst) {
            return Err(SourceError::AuthenticationFailed(
                "Login name or password is incorrect.".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_hosts(&self) -> SourceResult<Vec<RawHost>> {
        Ok(self.hosts.lock().unwrap().clone())
    }

    async fn list_items(&self, host_id: &str) -> SourceResult<Vec<RawItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(host_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn history(
        &self,
        item_id: &str,
        _kind: ValueKind,
        from: i64,
        till: i64,
    ) -> SourceResult<Vec<RawSample>> {
        self.windows
            .lock()
            .unwrap()
            .push((item_id.to_string(), from, till));

        let delay = *self.history_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_item.lock().unwrap().as_deref() == Some(item_id) {
            return Err(SourceError::Status(502));
        }

        Ok(self
            .samples
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Source with two hosts and a mix of numeric and text items
///
/// Host 10084 has a memory item (3 samples, one with a broken clock) and a
/// CPU item (1 sample); host 10085 has a network item (2 samples) and a
/// text item that must be skipped.
pub fn populated_source() -> Arc<FakeSource> {
    let source = FakeSource::new();

    source.add_host("10084", "Zabbix server");
    source.add_item("10084", "23296", "Used memory", "vm.memory.size[used]", "3");
    source.add_item("10084", "23297", "CPU load", "system.cpu.load[all,avg1]", "0");
    source.set_samples(
        "23296",
        vec![
            RawSample::new("1700000000", (5.0 * GIB).to_string()),
            RawSample::new("1700000060", "1234567890"),
            RawSample::new("bad", "2"),
        ],
    );
    source.set_samples("23297", vec![RawSample::new(1_700_000_000, 0.25)]);

    source.add_host("10085", "web-01");
    source.add_item("10085", "30001", "Incoming traffic", "net.if.in[eth0]", "3");
    source.add_item("10085", "30002", "OS name", "system.sw.os", "1");
    source.set_samples(
        "30001",
        vec![
            RawSample::new("1700000000", "2147483648"),
            RawSample::new("1700000060", "3221225472"),
        ],
    );

    source
}

/// Records produced by one sync of `populated_source`
pub const POPULATED_RECORDS: u64 = 5;

pub async fn open_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(temp_dir.path().join("monitor.db"))
        .await
        .unwrap();
    (temp_dir, Arc::new(store))
}

pub fn orchestrator(
    source: Arc<FakeSource>,
    store: Arc<dyn EntityStore>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(source, store, SyncSettings::default())
}

/// Raw history rows in insertion order
pub async fn history_rows(store: &SqliteStore) -> Vec<(String, i64, f64)> {
    sqlx::query_as("SELECT item_id, clock, value FROM history ORDER BY id")
        .fetch_all(store.pool())
        .await
        .unwrap()
}

/// Rows of the derived view in insertion order
pub async fn view_rows(store: &SqliteStore) -> Vec<(String, String, f64)> {
    sqlx::query_as("SELECT item_id, time, value_in_gb FROM history_readable ORDER BY id")
        .fetch_all(store.pool())
        .await
        .unwrap()
}

/// Store wrapper whose transactions fail to append history for one item,
/// or take their time to commit
pub struct FailingStore {
    inner: Arc<SqliteStore>,
    failing_item: Option<String>,
    commit_delay: Option<Duration>,
}

impl FailingStore {
    pub fn new(inner: Arc<SqliteStore>, failing_item: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_item: Some(failing_item.to_string()),
            commit_delay: None,
        })
    }

    pub fn slow_commit(inner: Arc<SqliteStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_item: None,
            commit_delay: Some(delay),
        })
    }
}

struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    failing_item: Option<String>,
    commit_delay: Option<Duration>,
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn upsert_host(&mut self, host: &Host) -> StorageResult<()> {
        self.inner.upsert_host(host).await
    }

    async fn upsert_item(&mut self, item: &Item) -> StorageResult<()> {
        self.inner.upsert_item(item).await
    }

    async fn append_history(&mut self, records: &[HistoryRecord]) -> StorageResult<u64> {
        if records
            .iter()
            .any(|r| Some(&r.item_id) == self.failing_item.as_ref())
        {
            return Err(StorageError::QueryFailed("disk I/O error".to_string()));
        }
        self.inner.append_history(records).await
    }

    async fn rebuild_view(&mut self) -> StorageResult<()> {
        self.inner.rebuild_view().await
    }

    async fn commit(&mut self) -> StorageResult<()> {
        if let Some(delay) = self.commit_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> StorageResult<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn begin(&self) -> StorageResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            failing_item: self.failing_item.clone(),
            commit_delay: self.commit_delay,
        }))
    }

    async fn list_hosts(&self) -> StorageResult<Vec<Host>> {
        self.inner.list_hosts().await
    }

    async fn list_items(&self, host_id: &str) -> StorageResult<Vec<Item>> {
        self.inner.list_items(host_id).await
    }

    async fn chart_data(
        &self,
        host_id: &str,
        category: Category,
    ) -> StorageResult<Vec<ChartPoint>> {
        self.inner.chart_data(host_id, category).await
    }

    async fn record_feedback(&self, feedback: &Feedback) -> StorageResult<i64> {
        self.inner.record_feedback(feedback).await
    }

    async fn totals(&self) -> StorageResult<StoreTotals> {
        self.inner.totals().await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        self.inner.health_check().await
    }

    async fn get_stats(&self) -> StorageResult<String> {
        self.inner.get_stats().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}
