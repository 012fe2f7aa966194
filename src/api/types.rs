//! API request and response types
//!
//! Field names follow what the dashboards consume: hosts are listed as
//! `{hostid, host}` like the monitoring API itself returns them.

use serde::{Deserialize, Serialize};

use crate::Host;
use crate::actors::SchedulerStatus;
use crate::storage::StoreTotals;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub timestamp: String,
    /// Store health message
    pub storage: String,
}

/// One entry of the host list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostid: String,
    pub host: String,
}

impl From<Host> for HostInfo {
    fn from(host: Host) -> Self {
        Self {
            hostid: host.id,
            host: host.name,
        }
    }
}

/// Query string of `/api/v1/chart_data`
#[derive(Debug, Clone, Deserialize)]
pub struct ChartQuery {
    pub host_id: String,
    pub category: String,
}

/// Body of `POST /api/v1/feedback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub host_id: String,
    #[serde(default)]
    pub item: Option<String>,
    pub feedback: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub id: i64,
    pub status: String,
}

/// Store and scheduler statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub totals: StoreTotals,
    /// Backend-specific summary line
    pub backend: String,
    pub scheduler: SchedulerStatus,
}
