//! Error types for storage operations

use std::fmt;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug)]
pub enum StorageError {
    /// Database connection failed
    ConnectionFailed(String),

    /// Database query failed
    QueryFailed(String),

    /// Migration failed
    MigrationFailed(String),

    /// A row references a parent that does not exist
    Referential(String),

    /// A stored value could not be mapped back to a domain type
    InvalidData(String),

    /// The transaction was already committed or rolled back
    TransactionClosed,

    /// I/O error (file access, etc.)
    IoError(std::io::Error),
}

impl StorageError {
    /// Referential failure for `child` (with `child_id`) pointing at a missing `parent`
    pub fn missing_parent(
        child: &str,
        child_id: impl fmt::Display,
        parent: &str,
        parent_id: impl fmt::Display,
    ) -> Self {
        StorageError::Referential(format!(
            "{child} {child_id} references unknown {parent} {parent_id}"
        ))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to storage backend: {}", msg)
            }
            StorageError::QueryFailed(msg) => write!(f, "storage query failed: {}", msg),
            StorageError::MigrationFailed(msg) => write!(f, "database migration failed: {}", msg),
            StorageError::Referential(msg) => write!(f, "referential integrity violated: {}", msg),
            StorageError::InvalidData(msg) => write!(f, "invalid stored data: {}", msg),
            StorageError::TransactionClosed => write!(f, "transaction already finished"),
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StorageError::IoError(io_err),
            sqlx::Error::RowNotFound => StorageError::QueryFailed("no rows found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StorageError::Referential(db_err.message().to_string())
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}
