//! Statistics endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState, types::StatsResponse};

/// GET /api/v1/stats
///
/// Store row counts, the backend summary line and scheduler bookkeeping
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let totals = state.store.totals().await?;
    let backend = state.store.get_stats().await?;
    let scheduler = state.scheduler.status().await?;

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        totals,
        backend,
        scheduler,
    }))
}
