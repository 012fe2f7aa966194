//! Host listing endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState, types::HostInfo};

/// GET /api/v1/hosts
pub async fn list_hosts(State(state): State<ApiState>) -> ApiResult<Json<Vec<HostInfo>>> {
    let hosts = state.store.list_hosts().await?;
    Ok(Json(hosts.into_iter().map(HostInfo::from).collect()))
}
