//! # KitFlow API
//!
//! HTTP layer: REST endpoints for requests, projects, users, sessions,
//! and the contact form, plus SSE feeds for live tracking. Every
//! response uses the `{ success, data, error }` envelope.

use axum::{
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post, put},
    Router,
};

pub mod auth;
pub mod auth_handlers;
pub mod contact_handlers;
pub mod projects_handlers;
pub mod requests_handlers;
pub mod response;
pub mod sse;
pub mod state;
pub mod users_handlers;

pub use response::{ApiError, ApiResponse, ApiResult};
pub use state::ApiState;

/// Liveness probe.
async fn health() -> impl IntoResponse {
    ResponseJson(ApiResponse::success(serde_json::json!({"status": "ok"})))
}

/// Creates the requests API router
pub fn create_requests_router() -> Router<ApiState> {
    Router::new()
        .route("/", post(requests_handlers::submit_request))
        .route("/", get(requests_handlers::list_requests))
        .route("/{id}/approve", post(requests_handlers::approve_request))
        .route("/{id}/decline", post(requests_handlers::decline_request))
}

/// Creates the projects API router
pub fn create_projects_router() -> Router<ApiState> {
    Router::new()
        .route("/", get(projects_handlers::list_projects))
        .route("/mine", get(projects_handlers::list_my_projects))
        .route("/mine/events", get(projects_handlers::my_project_events))
        .route("/seed", post(projects_handlers::seed_demo))
        .route("/{id}", get(projects_handlers::get_project))
        .route("/{id}/stage", put(projects_handlers::advance_stage))
        .route(
            "/{id}/stages/{stage}/notes",
            put(projects_handlers::update_stage_notes),
        )
        .route(
            "/{id}/stages/{stage}/image",
            put(projects_handlers::update_stage_image),
        )
        .route("/{id}/events", get(projects_handlers::project_events))
}

/// Creates the users API router
pub fn create_users_router() -> Router<ApiState> {
    Router::new()
        .route("/current", get(users_handlers::get_current_user))
        .route("/current", put(users_handlers::update_current_user))
        .route("/{user_id}/role", put(users_handlers::set_role))
}

/// Creates the session API router
pub fn create_auth_router() -> Router<ApiState> {
    Router::new()
        .route("/signin", post(auth_handlers::sign_in))
        .route("/signout", post(auth_handlers::sign_out))
}

/// Assembles the full application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", create_auth_router())
        .nest("/api/requests", create_requests_router())
        .nest("/api/projects", create_projects_router())
        .nest("/api/users", create_users_router())
        .route("/api/contact", post(contact_handlers::send_contact_message))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use kitflow_notify::Mailer;
    use kitflow_projects::{DbState, ProjectsManager};
    use kitflow_storage::test_utils::memory_pool;

    async fn test_state() -> ApiState {
        let db = DbState::new(memory_pool().await);
        let manager = Arc::new(ProjectsManager::new(
            db.clone(),
            Arc::new(Mailer::disabled("shop@kitflow.example")),
            "https://kitflow.example/tracking",
        ));
        ApiState::new(db, manager)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router.clone().oneshot(request).await.unwrap()
    }

    async fn admin_token(state: &ApiState, router: &Router) -> String {
        state.db.users.ensure_admin("ops@kitflow.example").await.unwrap();
        let response = send(
            router,
            "POST",
            "/api/auth/signin",
            None,
            Some(serde_json::json!({"email": "ops@kitflow.example", "name": "Operations"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn customer_token(router: &Router, email: &str, name: &str) -> String {
        let response = send(
            router,
            "POST",
            "/api/auth/signin",
            None,
            Some(serde_json::json!({"email": email, "name": name})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn request_body() -> serde_json::Value {
        serde_json::json!({
            "kind": "project",
            "name": "Asha",
            "email": "asha@example.com",
            "projectTitle": "Line Follower Bot",
            "description": "A bot that follows a black line."
        })
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let router = create_router(test_state().await);
        let response = send(&router, "GET", "/api/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn request_listing_requires_admin() {
        let state = test_state().await;
        let router = create_router(state.clone());

        // Unauthenticated
        let response = send(&router, "GET", "/api/requests", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Ordinary customer
        let token = customer_token(&router, "asha@example.com", "Asha").await;
        let response = send(&router, "GET", "/api/requests", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Administrator
        let token = admin_token(&state, &router).await;
        let response = send(&router, "GET", "/api/requests", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_approve_and_track_flow() {
        let state = test_state().await;
        let router = create_router(state.clone());

        // Public submission
        let response = send(&router, "POST", "/api/requests", None, Some(request_body())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let request_id = json_body(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        // Operator approves
        let admin = admin_token(&state, &router).await;
        let response = send(
            &router,
            "POST",
            &format!("/api/requests/{request_id}/approve"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        let project_id = body["data"]["projectId"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["currentStage"], "components_collected");

        // The request is no longer pending
        let response = send(&router, "GET", "/api/requests", Some(&admin), None).await;
        let body = json_body(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        // The owner can read their project
        let owner = customer_token(&router, "asha@example.com", "Asha").await;
        let response = send(
            &router,
            "GET",
            &format!("/api/projects/{project_id}"),
            Some(&owner),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // A different customer cannot
        let stranger = customer_token(&router, "ravi@example.com", "Ravi").await;
        let response = send(
            &router,
            "GET",
            &format!("/api/projects/{project_id}"),
            Some(&stranger),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_submission_reports_fields() {
        let router = create_router(test_state().await);

        let response = send(
            &router,
            "POST",
            "/api/requests",
            None,
            Some(serde_json::json!({
                "kind": "project",
                "name": "",
                "email": "asha@example.com"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("name"));
        assert!(message.contains("projectTitle"));
        assert!(message.contains("description"));
    }

    #[tokio::test]
    async fn advancing_a_stage_cascades() {
        let state = test_state().await;
        let router = create_router(state.clone());
        let admin = admin_token(&state, &router).await;

        let response = send(&router, "POST", "/api/requests", None, Some(request_body())).await;
        let request_id = json_body(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        let response = send(
            &router,
            "POST",
            &format!("/api/requests/{request_id}/approve"),
            Some(&admin),
            None,
        )
        .await;
        let project_id = json_body(response).await["data"]["projectId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = send(
            &router,
            "PUT",
            &format!("/api/projects/{project_id}/stage"),
            Some(&admin),
            Some(serde_json::json!({"stage": "testing"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["currentStage"], "testing");
        assert_eq!(body["data"]["stages"]["programming"]["status"], "completed");
        assert_eq!(body["data"]["stages"]["shipping"]["status"], "pending");
        // 4 of 6 stages reached
        assert!((body["data"]["progressPercentage"].as_f64().unwrap() - 66.66).abs() < 1.0);
    }

    #[tokio::test]
    async fn unknown_stage_in_path_is_rejected() {
        let state = test_state().await;
        let router = create_router(state.clone());
        let admin = admin_token(&state, &router).await;

        let response = send(
            &router,
            "PUT",
            "/api/projects/SK-1000/stages/polishing/notes",
            Some(&admin),
            Some(serde_json::json!({"notes": "n/a"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signout_revokes_the_session() {
        let state = test_state().await;
        let router = create_router(state.clone());
        let token = customer_token(&router, "asha@example.com", "Asha").await;

        let response = send(&router, "GET", "/api/users/current", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&router, "POST", "/api/auth/signout", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&router, "GET", "/api/users/current", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
