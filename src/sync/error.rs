//! Error types for sync runs

use std::fmt;

use crate::source::SourceError;
use crate::storage::StorageError;

/// Why a sync run was aborted
///
/// Every variant except `AlreadyRunning` means the run started and was
/// rolled back; the store is unchanged. `AlreadyRunning` means the run
/// never started.
#[derive(Debug)]
pub enum SyncError {
    /// The monitoring API could not be reached, refused the login or
    /// returned something that could not be decoded
    SourceUnavailable(SourceError),

    /// A write referenced a host or item that is not stored
    Referential(String),

    /// Any other storage failure
    Store(StorageError),

    /// The run did not finish before its deadline
    DeadlineExceeded,

    /// Another run of the same orchestrator is in progress
    AlreadyRunning,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::SourceUnavailable(err) => write!(f, "monitoring source unavailable: {}", err),
            SyncError::Referential(msg) => write!(f, "referential integrity violated: {}", msg),
            SyncError::Store(err) => write!(f, "store failure: {}", err),
            SyncError::DeadlineExceeded => write!(f, "sync run exceeded its deadline"),
            SyncError::AlreadyRunning => write!(f, "a sync run is already in progress"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::SourceUnavailable(err) => Some(err),
            SyncError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        SyncError::SourceUnavailable(err)
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Referential(msg) => SyncError::Referential(msg),
            other => SyncError::Store(other),
        }
    }
}
