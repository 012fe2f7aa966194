//! SyncOrchestrator - runs the pipeline once per invocation
//!
//! A run holds exactly one store transaction. It lives in a slot owned by
//! the caller of the timed part of the run, so that a failure or an expired
//! deadline always ends in an explicit rollback. The commit itself is never
//! cut short by the deadline: once started it succeeds or fails on its own.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, trace, warn};

use super::{SyncError, SyncReport, SyncSettings};
use crate::Host;
use crate::source::{MonitoringSource, RawHost, sanitize_samples};
use crate::storage::{EntityStore, StoreTransaction};

type TransactionSlot = Option<Box<dyn StoreTransaction>>;

#[derive(Debug, Default)]
struct RunCounts {
    hosts: usize,
    items: usize,
    items_skipped: usize,
    records_appended: u64,
    samples_dropped: usize,
}

/// Drives sync runs from a monitoring source into an entity store
pub struct SyncOrchestrator {
    source: Arc<dyn MonitoringSource>,
    store: Arc<dyn EntityStore>,
    settings: SyncSettings,

    /// Held for the duration of a run
    running: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MonitoringSource>,
        store: Arc<dyn EntityStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
            running: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run once, bounded by the configured run timeout (if any)
    ///
    /// Returns `SyncError::AlreadyRunning` without touching the source or
    /// the store when another run is in progress.
    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        let deadline = self.settings.run_timeout.map(|t| Instant::now() + t);
        self.run(deadline).await
    }

    /// Run once, aborting with `SyncError::DeadlineExceeded` at `deadline`
    pub async fn run_until(&self, deadline: Instant) -> Result<SyncReport, SyncError> {
        self.run(Some(deadline)).await
    }

    #[instrument(skip(self))]
    async fn run(&self, deadline: Option<Instant>) -> Result<SyncReport, SyncError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;

        let started_at = Utc::now();
        let timer = std::time::Instant::now();

        let window_till = started_at.timestamp();
        let window_secs = i64::try_from(self.settings.window.as_secs()).unwrap_or(i64::MAX);
        let window_from = window_till.saturating_sub(window_secs);

        info!("starting sync run (window {window_from}..{window_till})");

        let mut slot: TransactionSlot = None;
        let mut counts = RunCounts::default();

        let pass = self.execute(&mut slot, &mut counts, window_from, window_till);
        let mut outcome = match deadline {
            Some(deadline) => timeout_at(deadline, pass)
                .await
                .unwrap_or(Err(SyncError::DeadlineExceeded)),
            None => pass.await,
        };

        if outcome.is_ok() && deadline.is_some_and(|d| Instant::now() >= d) {
            outcome = Err(SyncError::DeadlineExceeded);
        }

        if let Err(e) = outcome {
            if let Some(mut tx) = slot.take() {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after failed run did not complete: {rollback_err}");
                }
            }
            warn!("sync run aborted: {e}");
            return Err(e);
        }

        if let Some(mut tx) = slot.take() {
            if let Err(e) = tx.commit().await {
                warn!("sync run aborted at commit: {e}");
                return Err(e.into());
            }
        }

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            window_from,
            window_till,
            hosts: counts.hosts,
            items: counts.items,
            items_skipped: counts.items_skipped,
            records_appended: counts.records_appended,
            samples_dropped: counts.samples_dropped,
            duration_ms: timer.elapsed().as_millis() as u64,
        };

        info!(
            hosts = report.hosts,
            items = report.items,
            records = report.records_appended,
            dropped = report.samples_dropped,
            "sync run committed in {}ms",
            report.duration_ms
        );

        Ok(report)
    }

    /// The timed part of a run, from authentication to the view rebuild
    async fn execute(
        &self,
        slot: &mut TransactionSlot,
        counts: &mut RunCounts,
        from: i64,
        till: i64,
    ) -> Result<(), SyncError> {
        self.source.authenticate().await?;

        let hosts: Vec<Host> = self
            .source
            .list_hosts()
            .await?
            .into_iter()
            .map(RawHost::into_host)
            .collect();
        debug!("source returned {} hosts", hosts.len());

        let tx = slot.insert(self.store.begin().await?);

        for host in &hosts {
            tx.upsert_host(host).await?;
        }
        counts.hosts = hosts.len();

        for host in &hosts {
            self.sync_host(tx.as_mut(), host, from, till, counts).await?;
        }

        tx.rebuild_view().await?;

        Ok(())
    }

    #[instrument(skip(self, tx, counts), fields(host_id = %host.id))]
    async fn sync_host(
        &self,
        tx: &mut dyn StoreTransaction,
        host: &Host,
        from: i64,
        till: i64,
        counts: &mut RunCounts,
    ) -> Result<(), SyncError> {
        let raw_items = self.source.list_items(&host.id).await?;

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match raw.value_kind() {
                Some(kind) => items.push(raw.into_item(kind)),
                None if raw.value_type.trim().parse::<u8>().is_err() => {
                    warn!(item_id = %raw.itemid, "skipping item with unreadable value type {:?}", raw.value_type);
                    counts.items_skipped += 1;
                }
                None => {
                    trace!(item_id = %raw.itemid, "skipping non-numeric item (value type {})", raw.value_type);
                    counts.items_skipped += 1;
                }
            }
        }

        for item in &items {
            tx.upsert_item(item).await?;
        }
        counts.items += items.len();

        for item in &items {
            let samples = self
                .source
                .history(&item.id, item.value_kind, from, till)
                .await?;

            let batch = sanitize_samples(&item.id, samples);
            for rejected in &batch.rejected {
                debug!(item_id = %item.id, "dropping sample: {rejected}");
            }
            counts.samples_dropped += batch.rejected.len();

            if !batch.records.is_empty() {
                counts.records_appended += tx.append_history(&batch.records).await?;
            }
        }

        debug!("host synced: {} numeric items", items.len());
        Ok(())
    }
}
