//! Message types for actor communication
//!
//! Commands are sent to the scheduler over an mpsc channel; `SyncNow` carries
//! a oneshot sender for the reply. The status is shared state, read without a
//! round trip through the actor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::sync::{SyncError, SyncReport};

/// Commands that can be sent to a SyncActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run immediately (bypassing the interval timer) and reply with the outcome,
    /// or with `SyncError::AlreadyRunning` while a run is in progress
    SyncNow {
        respond_to: oneshot::Sender<Result<SyncReport, SyncError>>,
    },

    /// Change the interval between scheduled runs
    UpdateInterval { interval_secs: u64 },

    /// Stop the actor
    Shutdown,
}

/// Bookkeeping of the runs a scheduler has performed
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    /// Runs attempted, scheduled and on demand
    pub runs: u64,

    /// Runs that ended in an error
    pub failures: u64,

    pub interval_secs: u64,

    /// A run started by the scheduler is in progress
    pub running: bool,

    pub last_success: Option<DateTime<Utc>>,

    /// Message of the most recent failure
    pub last_error: Option<String>,

    /// Report of the most recent committed run
    pub last_report: Option<SyncReport>,
}
