//! Sync trigger and status endpoints

use axum::{Json, extract::State};
use tracing::info;

use crate::actors::SchedulerStatus;
use crate::api::{error::ApiResult, state::ApiState};
use crate::sync::SyncReport;

/// POST /api/v1/sync
///
/// Runs a sync through the scheduler and answers with its report. Failed
/// runs map to 409 (already running), 502 (source), 504 (deadline) or 500.
pub async fn trigger_sync(State(state): State<ApiState>) -> ApiResult<Json<SyncReport>> {
    info!("sync requested via API");
    let report = state.scheduler.sync_now().await?;
    Ok(Json(report))
}

/// GET /api/v1/sync/status
pub async fn sync_status(State(state): State<ApiState>) -> ApiResult<Json<SchedulerStatus>> {
    Ok(Json(state.scheduler.status().await?))
}
