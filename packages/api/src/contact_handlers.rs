// ABOUTME: HTTP request handler for the contact form
// ABOUTME: Validates and relays messages to the shop inbox

use axum::{
    extract::State,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use tracing::info;

use crate::response::{ApiResponse, ApiResult};
use crate::state::ApiState;
use kitflow_core::ContactInput;

/// Relay a contact-form message to the shop inbox (public).
pub async fn send_contact_message(
    State(state): State<ApiState>,
    Json(input): Json<ContactInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Contact message from {}", input.email);

    state.manager.send_contact_message(input).await?;
    Ok(ResponseJson(ApiResponse::success(
        serde_json::json!({"message": "Message sent, we'll get back to you soon"}),
    )))
}
