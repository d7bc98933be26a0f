// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides the consistent { success, data, error } envelope across all endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;

use kitflow_projects::{ManagerError, StorageError};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Failures a handler can answer with.
#[derive(Debug)]
pub enum ApiError {
    Manager(ManagerError),
    Storage(StorageError),
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
}

impl From<ManagerError> for ApiError {
    fn from(e: ManagerError) -> Self {
        ApiError::Manager(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Manager(ManagerError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("Not found: {what}"))
            }
            ApiError::Manager(ManagerError::Validation(errors)) => {
                let fields = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                (StatusCode::BAD_REQUEST, fields)
            }
            ApiError::Manager(ManagerError::Notify(_)) => (
                StatusCode::BAD_GATEWAY,
                "Failed to deliver the message, please try again".to_string(),
            ),
            ApiError::Manager(ManagerError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Storage(StorageError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            ApiError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Administrator access required".to_string(),
            ),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
        };

        (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
