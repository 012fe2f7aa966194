//! SQLite entity store implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers keep seeing the last committed state while a sync
//!   run holds its write transaction, including the previous definition of
//!   the derived view until the run commits
//! - **Foreign keys**: Enforced by SQLite in addition to the explicit
//!   parent checks done before each write
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Limitations
//!
//! - **Concurrency**: One writer at a time; a second sync transaction waits
//!   on the busy timeout
//! - **Distributed**: Single-machine only

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};
use tracing::{debug, info, instrument, trace, warn};

use super::backend::{EntityStore, HealthStatus, StoreTransaction};
use super::error::{StorageError, StorageResult};
use super::schema::{CREATE_HISTORY_VIEW, ChartPoint, DROP_HISTORY_VIEW, StoreTotals};
use crate::{Category, Feedback, HistoryRecord, Host, Item, ValueKind};

const HOST_EXISTS: &str = "SELECT COUNT(*) FROM hosts WHERE id = ?";

const ITEM_EXISTS: &str = "SELECT COUNT(*) FROM items WHERE id = ?";

/// SQLite entity store
///
/// Cheap to share behind an `Arc`; the connection pool is internally
/// synchronized.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database and bring the schema up to date
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use monitor_sync::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./monitor.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

async fn exists(conn: &mut SqliteConnection, sql: &str, id: &str) -> StorageResult<bool> {
    let count: i64 = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Write transaction of one sync run
pub struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn conn(&mut self) -> StorageResult<&mut SqliteConnection> {
        self.tx.as_deref_mut().ok_or(StorageError::TransactionClosed)
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    #[instrument(skip(self, host), fields(host_id = %host.id))]
    async fn upsert_host(&mut self, host: &Host) -> StorageResult<()> {
        let conn = self.conn()?;

        sqlx::query(
            r#"
            INSERT INTO hosts (id, name)
            VALUES (?, ?)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(&host.id)
        .bind(&host.name)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn upsert_item(&mut self, item: &Item) -> StorageResult<()> {
        let conn = self.conn()?;

        if !exists(conn, HOST_EXISTS, &item.host_id).await? {
            return Err(StorageError::missing_parent(
                "item",
                &item.id,
                "host",
                &item.host_id,
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO items (id, host_id, name, item_key, category, value_kind)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                item_key = excluded.item_key,
                category = excluded.category
            "#,
        )
        .bind(&item.id)
        .bind(&item.host_id)
        .bind(&item.name)
        .bind(&item.key)
        .bind(item.category.as_str())
        .bind(item.value_kind.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn append_history(&mut self, records: &[HistoryRecord]) -> StorageResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self.conn()?;

        let item_ids: BTreeSet<&str> = records.iter().map(|r| r.item_id.as_str()).collect();
        for item_id in item_ids {
            if !exists(conn, ITEM_EXISTS, item_id).await? {
                return Err(StorageError::Referential(format!(
                    "history record references unknown item {item_id}"
                )));
            }
        }

        let mut written = 0;
        for record in records {
            let result = sqlx::query("INSERT INTO history (item_id, clock, value) VALUES (?, ?, ?)")
                .bind(&record.item_id)
                .bind(record.clock)
                .bind(record.value)
                .execute(&mut *conn)
                .await?;
            written += result.rows_affected();
        }

        trace!("appended {written} history records");
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn rebuild_view(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;

        // DDL is transactional in SQLite: readers keep the old view until commit
        sqlx::query(DROP_HISTORY_VIEW).execute(&mut *conn).await?;
        sqlx::query(CREATE_HISTORY_VIEW).execute(&mut *conn).await?;

        debug!("history view rebuilt");
        Ok(())
    }

    async fn commit(&mut self) -> StorageResult<()> {
        let tx = self.tx.take().ok_or(StorageError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> StorageResult<()> {
        let tx = self.tx.take().ok_or(StorageError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn begin(&self) -> StorageResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    #[instrument(skip(self))]
    async fn list_hosts(&self) -> StorageResult<Vec<Host>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM hosts ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Host { id, name })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_items(&self, host_id: &str) -> StorageResult<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, host_id, name, item_key, category, value_kind
            FROM items
            WHERE host_id = ?
            ORDER BY id
            "#,
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let category: String = row.get("category");
                let value_kind: String = row.get("value_kind");

                Ok(Item {
                    id: row.get("id"),
                    host_id: row.get("host_id"),
                    name: row.get("name"),
                    key: row.get("item_key"),
                    category: category
                        .parse::<Category>()
                        .map_err(|e| StorageError::InvalidData(e.to_string()))?,
                    value_kind: value_kind
                        .parse::<ValueKind>()
                        .map_err(StorageError::InvalidData)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn chart_data(
        &self,
        host_id: &str,
        category: Category,
    ) -> StorageResult<Vec<ChartPoint>> {
        let rows: Vec<(String, String, f64)> = sqlx::query_as(
            r#"
            SELECT v.name, v.time, v.value_in_gb
            FROM history_readable v
            JOIN items i ON v.item_id = i.id
            WHERE i.host_id = ? AND i.category = ?
            ORDER BY v.time ASC, v.id ASC
            "#,
        )
        .bind(host_id)
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!("chart query returned {} points", rows.len());

        Ok(rows
            .into_iter()
            .map(|(metric, time, value)| ChartPoint {
                metric,
                time,
                value,
            })
            .collect())
    }

    #[instrument(skip(self, feedback), fields(host_id = %feedback.host_id))]
    async fn record_feedback(&self, feedback: &Feedback) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO feedbacks (host_id, item, feedback, comment, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&feedback.host_id)
        .bind(&feedback.item)
        .bind(&feedback.feedback)
        .bind(&feedback.comment)
        .bind(feedback.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn totals(&self) -> StorageResult<StoreTotals> {
        let (hosts, items, history): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM hosts),
                (SELECT COUNT(*) FROM items),
                (SELECT COUNT(*) FROM history)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreTotals {
            hosts: hosts as u64,
            items: items as u64,
            history: history as u64,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite store operational".to_string(),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let totals = self.totals().await?;

        let range: (Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT MIN(clock), MAX(clock) FROM history")
                .fetch_one(&self.pool)
                .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        let time_range = match range {
            (Some(oldest), Some(newest)) => {
                let fmt = |clock: i64| {
                    chrono::DateTime::from_timestamp(clock, 0)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| clock.to_string())
                };
                format!("{} to {}", fmt(oldest), fmt(newest))
            }
            _ => "no data".to_string(),
        };

        Ok(format!(
            "SQLite: {} hosts, {} items, {} history rows, {:.2} MB on disk, time range: {}",
            totals.hosts, totals.items, totals.history, file_size_mb, time_range
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
