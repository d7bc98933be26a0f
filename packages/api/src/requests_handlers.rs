// ABOUTME: HTTP request handlers for custom-work requests
// ABOUTME: Public submission plus the operator's approve/decline flow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use tracing::info;

use crate::auth::AdminUser;
use crate::response::{ApiResponse, ApiResult};
use crate::state::ApiState;
use kitflow_core::RequestCreateInput;

/// Submit a new custom-work request (public).
pub async fn submit_request(
    State(state): State<ApiState>,
    Json(input): Json<RequestCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Submitting {} request from {}", input.kind, input.email);

    let request = state.manager.submit_request(input).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(request)),
    ))
}

/// List pending requests, newest first (admin).
pub async fn list_requests(
    State(state): State<ApiState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let requests = state.manager.pending_requests().await?;
    info!("Retrieved {} pending requests", requests.len());
    Ok(ResponseJson(ApiResponse::success(requests)))
}

/// Approve a request, converting it into a tracked project (admin).
pub async fn approve_request(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Approving request {}", id);

    let project = state.manager.approve_request(&id).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(project)),
    ))
}

/// Decline and delete a request (admin).
pub async fn decline_request(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Declining request {}", id);

    state.manager.decline_request(&id).await?;
    Ok(ResponseJson(ApiResponse::success(
        serde_json::json!({"message": "Request declined and user notified"}),
    )))
}
