//! Relational entity store
//!
//! Hosts, items and their history live in a small relational schema with
//! foreign keys from history to items and from items to hosts. A derived
//! view (`history_readable`) presents history for dashboards and is rebuilt
//! at the end of every sync run.
//!
//! ## Design
//!
//! - **Trait-based**: `EntityStore` allows swapping implementations
//! - **Transactional**: every write of a sync run goes through a single
//!   `StoreTransaction`, so a run is applied entirely or not at all
//! - **Append-only history**: overlapping windows may store the same
//!   sample twice; the view reads each `(item, clock)` once
//!
//! ## Usage
//!
//! ```no_run
//! use monitor_sync::Host;
//! use monitor_sync::storage::{EntityStore, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::new("./monitor.db").await?;
//!     let mut tx = store.begin().await?;
//!     tx.upsert_host(&Host { id: "10084".into(), name: "Zabbix server".into() }).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{EntityStore, HealthStatus, StoreTransaction};
pub use error::{StorageError, StorageResult};
pub use schema::{ChartPoint, StoreTotals};
