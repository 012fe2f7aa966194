//! Entity store trait definitions
//!
//! Writes and reads are split across two traits:
//!
//! - `EntityStore` is the shared handle. It opens transactions and serves
//!   the read side (API queries, statistics).
//! - `StoreTransaction` carries every write of a sync run. Nothing it does
//!   becomes visible until `commit`; `rollback` (or dropping it) discards
//!   all of it.

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{ChartPoint, StoreTotals};
use crate::{Category, Feedback, HistoryRecord, Host, Item};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,
}

/// Relational store for hosts, items and history
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the same handle is shared by the
/// orchestrator, the scheduler and the API.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Open a transaction spanning one sync run
    async fn begin(&self) -> StorageResult<Box<dyn StoreTransaction>>;

    /// All stored hosts, ordered by id
    async fn list_hosts(&self) -> StorageResult<Vec<Host>>;

    /// Stored items of a host, ordered by id
    async fn list_items(&self, host_id: &str) -> StorageResult<Vec<Item>>;

    /// Readable history of a host's items in one category, oldest first
    ///
    /// Served from the derived view, so values are already converted.
    async fn chart_data(&self, host_id: &str, category: Category)
    -> StorageResult<Vec<ChartPoint>>;

    /// Persist a feedback entry, returning its id
    async fn record_feedback(&self, feedback: &Feedback) -> StorageResult<i64>;

    /// Row counts of the entity tables
    async fn totals(&self) -> StorageResult<StoreTotals>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable statistics (e.g. "SQLite: 3 hosts, 120 items, ...")
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}

/// Write side of a single sync run
///
/// All operations run inside the same database transaction. After `commit`
/// or `rollback` every further call fails with
/// `StorageError::TransactionClosed`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert the host, or update its name when the id already exists
    async fn upsert_host(&mut self, host: &Host) -> StorageResult<()>;

    /// Insert the item, or update name, key and category when it exists
    ///
    /// Fails with `StorageError::Referential` if the host is not stored.
    async fn upsert_item(&mut self, item: &Item) -> StorageResult<()>;

    /// Append history records, returning how many were written
    ///
    /// The batch is checked before anything is written: if any record
    /// references an unknown item the whole batch fails with
    /// `StorageError::Referential`. Duplicates are appended as-is.
    async fn append_history(&mut self, records: &[HistoryRecord]) -> StorageResult<u64>;

    /// Replace the derived `history_readable` view
    async fn rebuild_view(&mut self) -> StorageResult<()>;

    async fn commit(&mut self) -> StorageResult<()>;

    async fn rollback(&mut self) -> StorageResult<()>;
}
