//! Chart data endpoint
//!
//! Reads the derived history view, so values are already converted to GiB
//! and each `(item, clock)` appears once.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::debug;

use crate::Category;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::ChartQuery,
};
use crate::storage::ChartPoint;

/// GET /api/v1/chart_data?host_id=..&category=..
///
/// `category` is one of CPU, Memory, Disk, Network, Service, Other.
pub async fn chart_data(
    State(state): State<ApiState>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<Json<Vec<ChartPoint>>> {
    let category: Category = query
        .category
        .parse()
        .map_err(|e| ApiError::InvalidRequest(format!("{e}")))?;

    let points = state.store.chart_data(&query.host_id, category).await?;
    debug!(
        "serving {} points for host {} ({category})",
        points.len(),
        query.host_id
    );

    Ok(Json(points))
}
