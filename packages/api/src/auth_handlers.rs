// ABOUTME: HTTP request handlers for the session lifecycle
// ABOUTME: Records sign-ins from the auth provider, issues and revokes opaque session tokens

use axum::{
    extract::State,
    http::header::AUTHORIZATION,
    http::HeaderMap,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::ApiState;
use kitflow_core::User;

/// Request body for recording a sign-in
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub name: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
}

/// Session response: the opaque token plus the stored user record.
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// Record a sign-in and issue a session token.
pub async fn sign_in(
    State(state): State<ApiState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }

    let user = state
        .db
        .users
        .upsert_signin(email, request.name.trim(), request.photo_url.as_deref())
        .await?;
    let token = state.db.users.create_session(&user.id).await?;

    info!("Signed in {} ({})", user.email, user.id);
    Ok(ResponseJson(ApiResponse::success(SessionResponse {
        token,
        user,
    })))
}

/// Revoke the presented session token.
pub async fn sign_out(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    state.db.users.delete_session(token).await?;
    info!("Session revoked");

    Ok(ResponseJson(ApiResponse::success(
        serde_json::json!({"message": "Signed out"}),
    )))
}
