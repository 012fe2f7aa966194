//! Sync pipeline
//!
//! One sync run pulls hosts, their monitored numeric items and the recent
//! history of each item from a `MonitoringSource`, writes all of it through
//! a single `StoreTransaction` and rebuilds the derived view before
//! committing.
//!
//! ```text
//! authenticate → list hosts → BEGIN → upsert hosts
//!     → per host:  list items → keep numeric → upsert items
//!         → per item: history → sanitize → append
//!     → rebuild view → COMMIT
//! ```
//!
//! Any failure along the way (source, store, deadline) rolls the whole run
//! back. Samples that fail sanitization are dropped and counted instead.

pub mod error;
pub mod orchestrator;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SyncConfig;

pub use error::SyncError;
pub use orchestrator::SyncOrchestrator;

/// Per-run parameters of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Length of the trailing history window
    pub window: Duration,

    /// Deadline for a whole run started with `run_sync`
    pub run_timeout: Option<Duration>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            run_timeout: (config.run_timeout_secs > 0)
                .then(|| Duration::from_secs(config.run_timeout_secs)),
        }
    }
}

/// Summary of a committed sync run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// History window requested from the source, unix seconds
    pub window_from: i64,
    pub window_till: i64,

    pub hosts: usize,

    /// Numeric items stored
    pub items: usize,

    /// Items ignored because their value type is not numeric
    pub items_skipped: usize,

    pub records_appended: u64,

    /// Samples dropped by sanitization
    pub samples_dropped: usize,

    pub duration_ms: u64,
}
