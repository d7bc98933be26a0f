// ABOUTME: HTTP request handlers for user accounts
// ABOUTME: Profile reads and updates, plus admin role provisioning

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::{AdminUser, CurrentUser};
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::ApiState;
use kitflow_core::{Role, UserProfileInput};

/// Get the signed-in user.
pub async fn get_current_user(current_user: CurrentUser) -> impl IntoResponse {
    ResponseJson(ApiResponse::success(current_user.0))
}

/// Update the signed-in user's own profile fields.
pub async fn update_current_user(
    State(state): State<ApiState>,
    current_user: CurrentUser,
    Json(input): Json<UserProfileInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Updating profile for user {}", current_user.0.id);

    let user = state
        .db
        .users
        .update_profile(&current_user.0.id, input)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Request body for role provisioning
#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Set another user's role (admin provisioning step).
pub async fn set_role(
    State(state): State<ApiState>,
    admin: AdminUser,
    Path(user_id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    // An admin demoting themselves would lock the dashboard.
    if admin.0.id == user_id && request.role != Role::Admin {
        return Err(ApiError::BadRequest(
            "Cannot remove your own administrator role".to_string(),
        ));
    }

    info!("Setting role {} for user {}", request.role, user_id);
    state.db.users.set_role(&user_id, request.role).await?;

    let user = state
        .db
        .users
        .get(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id}")))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}
