//! Monitoring source abstraction
//!
//! The sync pipeline only needs three queries from the monitoring API:
//! hosts, monitored items of a host, and the history of an item within a
//! time window. `MonitoringSource` captures exactly that contract so the
//! orchestrator can be driven by the Zabbix client in production and by
//! in-memory fakes in tests.
//!
//! Responses are returned as raw transfer objects (`RawHost`, `RawItem`,
//! `RawSample`) whose fields are untyped until they are validated.

pub mod error;
pub mod raw;
pub mod zabbix;

use async_trait::async_trait;

use crate::ValueKind;

pub use error::{SourceError, SourceResult};
pub use raw::{RawHost, RawItem, RawSample, SanitizationError, SanitizedBatch, sanitize_samples};
pub use zabbix::ZabbixClient;

/// Read-only view of a remote monitoring API
#[async_trait]
pub trait MonitoringSource: Send + Sync {
    /// Establish (or refresh) a session before a run
    ///
    /// Sources that need no session keep the default no-op.
    async fn authenticate(&self) -> SourceResult<()> {
        Ok(())
    }

    /// All hosts known to the monitoring API
    async fn list_hosts(&self) -> SourceResult<Vec<RawHost>>;

    /// Monitored items of a single host, of any value type
    async fn list_items(&self, host_id: &str) -> SourceResult<Vec<RawItem>>;

    /// Samples of an item between `from` and `till` (unix seconds, inclusive),
    /// ordered by clock ascending
    async fn history(
        &self,
        item_id: &str,
        kind: ValueKind,
        from: i64,
        till: i64,
    ) -> SourceResult<Vec<RawSample>>;
}
