//! Feedback endpoint

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::Feedback;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{FeedbackRequest, FeedbackResponse},
};

/// POST /api/v1/feedback
///
/// Stores the annotation with the current time and answers 201 with its id.
pub async fn submit_feedback(
    State(state): State<ApiState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    if request.host_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("host_id must not be empty".to_string()));
    }
    if request.feedback.trim().is_empty() {
        return Err(ApiError::InvalidRequest("feedback must not be empty".to_string()));
    }

    let feedback = Feedback {
        host_id: request.host_id,
        item: request.item.filter(|item| !item.is_empty()),
        feedback: request.feedback,
        comment: request.comment,
        created_at: Utc::now(),
    };

    let id = state.store.record_feedback(&feedback).await?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            id,
            status: "ok".to_string(),
        }),
    ))
}
