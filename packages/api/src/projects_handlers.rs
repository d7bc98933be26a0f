// ABOUTME: HTTP request handlers for tracked projects
// ABOUTME: Operator stage updates and customer tracking views, including live SSE feeds

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json as ResponseJson, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::auth::{AdminUser, CurrentUser};
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::sse;
use crate::state::ApiState;
use kitflow_core::{StageKey, TrackedProject};

/// Project plus its derived progress, as sent to tracking views.
#[derive(Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: TrackedProject,
    #[serde(rename = "progressPercentage")]
    pub progress_percentage: f64,
}

impl From<TrackedProject> for ProjectView {
    fn from(project: TrackedProject) -> Self {
        let progress_percentage = kitflow_tracker::progress_percentage(&project);
        Self {
            project,
            progress_percentage,
        }
    }
}

fn parse_stage(value: &str) -> ApiResult<StageKey> {
    StageKey::parse(value).ok_or_else(|| ApiError::BadRequest(format!("Unknown stage: {value}")))
}

/// List every tracked project (admin).
pub async fn list_projects(
    State(state): State<ApiState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let projects = state.manager.list_projects().await?;
    info!("Retrieved {} projects", projects.len());

    let views: Vec<ProjectView> = projects.into_iter().map(ProjectView::from).collect();
    Ok(ResponseJson(ApiResponse::success(views)))
}

/// List the signed-in customer's projects.
pub async fn list_my_projects(
    State(state): State<ApiState>,
    current_user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let projects = state.manager.projects_for_user(&current_user.0.id).await?;
    let views: Vec<ProjectView> = projects.into_iter().map(ProjectView::from).collect();
    Ok(ResponseJson(ApiResponse::success(views)))
}

/// Get one project (owner or admin).
pub async fn get_project(
    State(state): State<ApiState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state
        .manager
        .get_project(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {id}")))?;

    if !current_user.can_view(&project.user_id) {
        return Err(ApiError::Forbidden);
    }

    Ok(ResponseJson(ApiResponse::success(ProjectView::from(project))))
}

/// Request body for advancing the current stage
#[derive(Deserialize)]
pub struct AdvanceStageRequest {
    pub stage: StageKey,
}

/// Move a project to a new current stage (admin). The cascade recomputes
/// every other stage; repeating the same target is safe.
pub async fn advance_stage(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(request): Json<AdvanceStageRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Advancing project {} to {}", id, request.stage);

    let project = state.manager.advance_project(&id, request.stage).await?;
    Ok(ResponseJson(ApiResponse::success(ProjectView::from(project))))
}

/// Request body for stage notes
#[derive(Deserialize)]
pub struct StageNotesRequest {
    pub notes: Option<String>,
}

/// Set the operator notes of one stage (admin).
pub async fn update_stage_notes(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Path((id, stage)): Path<(String, String)>,
    Json(request): Json<StageNotesRequest>,
) -> ApiResult<impl IntoResponse> {
    let stage = parse_stage(&stage)?;
    debug!("Updating notes on {} / {}", id, stage);

    let project = state
        .manager
        .update_stage_notes(&id, stage, request.notes)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ProjectView::from(project))))
}

/// Request body for a stage image reference
#[derive(Deserialize)]
pub struct StageImageRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

/// Set the image reference of one stage (admin).
pub async fn update_stage_image(
    State(state): State<ApiState>,
    _admin: AdminUser,
    Path((id, stage)): Path<(String, String)>,
    Json(request): Json<StageImageRequest>,
) -> ApiResult<impl IntoResponse> {
    let stage = parse_stage(&stage)?;
    debug!("Updating image on {} / {}", id, stage);

    let project = state
        .manager
        .update_stage_image(&id, stage, request.image_url)
        .await?;
    Ok(ResponseJson(ApiResponse::success(ProjectView::from(project))))
}

/// Seed the demonstration project (admin).
pub async fn seed_demo(
    State(state): State<ApiState>,
    _admin: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let project = state.manager.seed_demo_project().await?;
    Ok(ResponseJson(ApiResponse::success(ProjectView::from(project))))
}

/// Live feed for one project (owner or admin): an initial snapshot, then
/// one event per change until the client disconnects. Disconnecting
/// drops the broadcast receiver, which releases the subscription.
pub async fn project_events(
    State(state): State<ApiState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let project = state
        .manager
        .get_project(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {id}")))?;

    if !current_user.can_view(&project.user_id) {
        return Err(ApiError::Forbidden);
    }

    let mut rx = state.db.projects.events().subscribe();
    info!("Watch opened on project {}", id);

    let stream = async_stream::stream! {
        match sse::create_sse_event("snapshot", &ProjectView::from(project)) {
            Ok(event) => yield Ok::<_, Infallible>(event),
            Err(_) => yield Ok(sse::create_error_event("Failed to serialize snapshot")),
        }

        loop {
            match rx.recv().await {
                Ok(snapshot) if snapshot.project_id == id => {
                    match sse::create_sse_event("update", &ProjectView::from(snapshot)) {
                        Ok(event) => yield Ok(event),
                        Err(_) => yield Ok(sse::create_error_event("Failed to serialize update")),
                    }
                }
                Ok(_) => continue,
                // Missed some intermediate snapshots; the next one will
                // carry the full aggregate anyway.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(sse::create_sse_response(stream).into_response())
}

/// Live feed for every project owned by the signed-in customer.
pub async fn my_project_events(
    State(state): State<ApiState>,
    current_user: CurrentUser,
) -> ApiResult<Response> {
    let user_id = current_user.0.id.clone();
    let projects = state.manager.projects_for_user(&user_id).await?;

    let mut rx = state.db.projects.events().subscribe();
    info!("Watch opened for user {}", user_id);

    let stream = async_stream::stream! {
        for project in projects {
            match sse::create_sse_event("snapshot", &ProjectView::from(project)) {
                Ok(event) => yield Ok::<_, Infallible>(event),
                Err(_) => yield Ok(sse::create_error_event("Failed to serialize snapshot")),
            }
        }

        loop {
            match rx.recv().await {
                Ok(snapshot) if snapshot.user_id == user_id => {
                    match sse::create_sse_event("update", &ProjectView::from(snapshot)) {
                        Ok(event) => yield Ok(event),
                        Err(_) => yield Ok(sse::create_error_event("Failed to serialize update")),
                    }
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(sse::create_sse_response(stream).into_response())
}
