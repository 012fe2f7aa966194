//! SyncActor - runs the orchestrator on a timer and on demand
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ──┐
//!              ├─→ spawned run: SyncOrchestrator::run_sync → update status
//! SyncNow ─────┘                                            └→ reply (SyncNow only)
//!     ↑
//!     └─── Commands (SyncNow, UpdateInterval, Shutdown)
//! ```
//!
//! At most one run is in flight. It executes in its own task so the actor
//! keeps serving commands: a tick during a run is skipped and `SyncNow` is
//! answered with `SyncError::AlreadyRunning`. The status lives behind a
//! shared lock that handles read directly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, instrument, warn};

use super::messages::{SchedulerCommand, SchedulerStatus};
use crate::sync::{SyncError, SyncOrchestrator, SyncReport};

type SharedStatus = Arc<RwLock<SchedulerStatus>>;

fn schedule_ticker(period: Duration, immediately: bool) -> Interval {
    let start = if immediately {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Actor owning the schedule of one orchestrator
pub struct SyncActor {
    orchestrator: Arc<SyncOrchestrator>,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    interval_duration: Duration,

    run_on_start: bool,

    status: SharedStatus,

    /// Spawned runs, reaped as they finish
    runs: JoinSet<()>,
}

impl SyncActor {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        interval_duration: Duration,
        run_on_start: bool,
        status: SharedStatus,
    ) -> Self {
        Self {
            orchestrator,
            command_rx,
            interval_duration,
            run_on_start,
            status,
            runs: JoinSet::new(),
        }
    }

    /// Run the actor's main loop until `Shutdown` or until every handle is dropped
    ///
    /// A run in flight when the loop stops is awaited before returning.
    #[instrument(skip(self), fields(interval_secs = self.interval_duration.as_secs()))]
    pub async fn run(mut self) {
        debug!("starting sync scheduler");

        let mut ticker = schedule_ticker(self.interval_duration, self.run_on_start);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_running().await {
                        debug!("previous run still in progress, skipping tick");
                    } else {
                        self.start_run(None).await;
                    }
                }

                Some(finished) = self.runs.join_next(), if !self.runs.is_empty() => {
                    if let Err(e) = finished {
                        error!("sync run task failed: {e}");
                        self.status.write().await.running = false;
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::SyncNow { respond_to } => {
                            debug!("received SyncNow command");
                            if self.is_running().await {
                                let _ = respond_to.send(Err(SyncError::AlreadyRunning));
                            } else {
                                self.start_run(Some(respond_to)).await;
                            }
                        }

                        SchedulerCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs.max(1));
                            ticker = schedule_ticker(self.interval_duration, false);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        while self.runs.join_next().await.is_some() {}

        debug!("sync scheduler stopped");
    }

    /// Cleared by the run itself before it replies
    async fn is_running(&self) -> bool {
        self.status.read().await.running
    }

    async fn start_run(
        &mut self,
        respond_to: Option<oneshot::Sender<Result<SyncReport, SyncError>>>,
    ) {
        let run_number = {
            let mut status = self.status.write().await;
            status.runs += 1;
            status.running = true;
            status.runs
        };

        let orchestrator = self.orchestrator.clone();
        let status = self.status.clone();

        self.runs.spawn(async move {
            let result = orchestrator.run_sync().await;
            record_outcome(&status, run_number, &result).await;

            match respond_to {
                Some(respond_to) => {
                    let _ = respond_to.send(result);
                }
                None => {
                    if let Err(e) = result {
                        error!("scheduled sync failed: {e}");
                    }
                }
            }
        });
    }
}

async fn record_outcome(status: &RwLock<SchedulerStatus>, run_number: u64, result: &Result<SyncReport, SyncError>) {
    let mut status = status.write().await;
    status.running = false;

    match result {
        Ok(report) => {
            info!(
                "sync run {run_number} stored {} records from {} hosts",
                report.records_appended, report.hosts
            );
            status.last_success = Some(Utc::now());
            status.last_report = Some(report.clone());
        }
        Err(e) => {
            status.failures += 1;
            status.last_error = Some(e.to_string());
        }
    }
}

/// Handle for controlling a SyncActor
///
/// Cloneable; the actor stops once every handle is dropped.
#[derive(Clone)]
pub struct SyncHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    status: SharedStatus,
}

impl SyncHandle {
    /// Spawn the actor as a tokio task and return its handle
    ///
    /// With `run_on_start` the first run starts right away, otherwise after
    /// one full `interval`.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>, interval: Duration, run_on_start: bool) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let interval = interval.max(Duration::from_secs(1));
        let status = Arc::new(RwLock::new(SchedulerStatus {
            interval_secs: interval.as_secs(),
            ..SchedulerStatus::default()
        }));

        let actor = SyncActor::new(orchestrator, cmd_rx, interval, run_on_start, status.clone());

        tokio::spawn(actor.run());

        Self { sender: cmd_tx, status }
    }

    /// Run immediately and wait for the report
    ///
    /// A failed run is returned as the error; its `SyncError` can be
    /// recovered with `downcast_ref`. While another run is in progress this
    /// fails right away with `SyncError::AlreadyRunning`.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::SyncNow { respond_to: tx })
            .await
            .context("failed to send SyncNow command")?;

        let report = rx.await.context("failed to receive response")??;
        Ok(report)
    }

    /// Snapshot of the run bookkeeping, served even while a run is in progress
    pub async fn status(&self) -> Result<SchedulerStatus> {
        if self.sender.is_closed() {
            bail!("sync scheduler has stopped");
        }
        Ok(self.status.read().await.clone())
    }

    /// Update the interval between scheduled runs
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(SchedulerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        self.status.write().await.interval_secs = interval_secs.max(1);
        Ok(())
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
