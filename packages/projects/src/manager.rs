use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::DbState;
use kitflow_core::{
    validate_contact_input, validate_request_input, ContactInput, ProjectRequest,
    RequestCreateInput, StageKey, TrackedProject, ValidationError,
};
use kitflow_notify::{templates, Mailer, NotifyError};
use kitflow_storage::StorageError;

/// Manager errors
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// The operation layer: everything the handlers call goes through here.
///
/// Store writes are the primary effect of each operation; notification
/// is attempted afterwards and a failed notice never reverses a
/// committed write.
pub struct ProjectsManager {
    db: DbState,
    mailer: Arc<Mailer>,
    /// Public tracking-page URL included in approval notices.
    tracking_url: String,
}

impl ProjectsManager {
    pub fn new(db: DbState, mailer: Arc<Mailer>, tracking_url: impl Into<String>) -> Self {
        Self {
            db,
            mailer,
            tracking_url: tracking_url.into(),
        }
    }

    pub fn db(&self) -> &DbState {
        &self.db
    }

    /// Persists a customer request and notifies the shop inbox.
    ///
    /// Validation runs before any store or network call; the error lists
    /// each missing field.
    pub async fn submit_request(&self, input: RequestCreateInput) -> ManagerResult<ProjectRequest> {
        let validation_errors = validate_request_input(&input);
        if !validation_errors.is_empty() {
            return Err(ManagerError::Validation(validation_errors));
        }

        let request = self.db.requests.create(input).await?;
        info!("Request {} submitted by {}", request.id, request.email);

        let notice = templates::request_submitted(&request);
        if let Err(e) = self.mailer.send_to_shop(&notice.subject, &notice.html).await {
            warn!("Request saved but admin notice failed: {e}");
        }

        Ok(request)
    }

    /// Pending requests, newest first.
    pub async fn pending_requests(&self) -> ManagerResult<Vec<ProjectRequest>> {
        Ok(self.db.requests.list().await?)
    }

    /// Approves a request: one transaction allocates the project id,
    /// creates the project at the first stage, and removes the request.
    /// The requester is notified after the commit.
    pub async fn approve_request(&self, request_id: &str) -> ManagerResult<TrackedProject> {
        let request = self
            .db
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("Request {request_id}")))?;

        let owner = self
            .db
            .users
            .ensure_user_for_email(&request.email, &request.name)
            .await?;

        let project = self
            .db
            .projects
            .create_from_request(&request, &owner, Utc::now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ManagerError::NotFound(format!("Request {request_id}")),
                other => ManagerError::Storage(other),
            })?;

        info!(
            "Approved request {} into project {}",
            request.id, project.project_id
        );

        let notice = templates::request_approved(&request, &project.project_id, &self.tracking_url);
        if let Err(e) = self.mailer.send(&request.email, &notice.subject, &notice.html).await {
            warn!("Project created but approval notice failed: {e}");
        }

        Ok(project)
    }

    /// Declines a request: deletes it, then notifies the requester. The
    /// notice failing never restores the request.
    pub async fn decline_request(&self, request_id: &str) -> ManagerResult<()> {
        let request = self
            .db
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("Request {request_id}")))?;

        if !self.db.requests.delete(request_id).await? {
            return Err(ManagerError::NotFound(format!("Request {request_id}")));
        }
        info!("Declined request {}", request.id);

        let notice = templates::request_declined(&request);
        if let Err(e) = self.mailer.send(&request.email, &notice.subject, &notice.html).await {
            warn!("Request declined but notice failed: {e}");
        }

        Ok(())
    }

    pub async fn get_project(&self, project_id: &str) -> ManagerResult<Option<TrackedProject>> {
        Ok(self.db.projects.get(project_id).await?)
    }

    pub async fn list_projects(&self) -> ManagerResult<Vec<TrackedProject>> {
        Ok(self.db.projects.list().await?)
    }

    pub async fn projects_for_user(&self, user_id: &str) -> ManagerResult<Vec<TrackedProject>> {
        Ok(self.db.projects.list_for_user(user_id).await?)
    }

    /// Moves a project to `new_stage`, cascading the other stages, and
    /// persists the whole aggregate in one write.
    ///
    /// On a failed write nothing local survives; the caller re-reads and
    /// may retry the same target, which converges to the same state.
    pub async fn advance_project(
        &self,
        project_id: &str,
        new_stage: StageKey,
    ) -> ManagerResult<TrackedProject> {
        let mut project = self
            .db
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("Project {project_id}")))?;

        kitflow_tracker::advance_stage(&mut project, new_stage, Utc::now());
        self.db.projects.save(&project).await?;

        info!("Project {} advanced to {}", project.project_id, new_stage);
        Ok(project)
    }

    /// Sets the notes of one stage. No cascade, no pointer movement.
    pub async fn update_stage_notes(
        &self,
        project_id: &str,
        stage: StageKey,
        notes: Option<String>,
    ) -> ManagerResult<TrackedProject> {
        let mut project = self
            .db
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("Project {project_id}")))?;

        kitflow_tracker::update_notes(&mut project, stage, notes);
        project.updated_at = Utc::now();
        self.db.projects.save(&project).await?;

        Ok(project)
    }

    /// Sets the image reference of one stage.
    pub async fn update_stage_image(
        &self,
        project_id: &str,
        stage: StageKey,
        image_url: Option<String>,
    ) -> ManagerResult<TrackedProject> {
        let mut project = self
            .db
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("Project {project_id}")))?;

        kitflow_tracker::update_image(&mut project, stage, image_url);
        project.updated_at = Utc::now();
        self.db.projects.save(&project).await?;

        Ok(project)
    }

    /// Relays a contact-form message to the shop inbox. There is no
    /// store write here, so a delivery failure is the operation failing.
    pub async fn send_contact_message(&self, input: ContactInput) -> ManagerResult<()> {
        let validation_errors = validate_contact_input(&input);
        if !validation_errors.is_empty() {
            return Err(ManagerError::Validation(validation_errors));
        }

        let notice = templates::contact_message(&input);
        self.mailer.send_to_shop(&notice.subject, &notice.html).await?;

        info!("Contact message relayed for {}", input.email);
        Ok(())
    }

    /// Seeds the demonstration project if it does not exist yet.
    pub async fn seed_demo_project(&self) -> ManagerResult<TrackedProject> {
        const DEMO_PROJECT_ID: &str = "SK-1024";

        if let Some(existing) = self.db.projects.get(DEMO_PROJECT_ID).await? {
            return Ok(existing);
        }

        let owner = self
            .db
            .users
            .ensure_user_for_email("demo@kitflow.example", "Demo Customer")
            .await?;

        let now = Utc::now();
        let mut project = TrackedProject {
            project_id: DEMO_PROJECT_ID.to_string(),
            user_id: owner.id,
            user_email: owner.email,
            title: "Obstacle-Avoidance Robot".to_string(),
            current_stage: StageKey::ALL[0],
            stages: kitflow_tracker::new_project_stages(now, None),
            created_at: now,
            updated_at: now,
        };
        kitflow_tracker::advance_stage(&mut project, StageKey::Programming, now);
        kitflow_tracker::update_notes(
            &mut project,
            StageKey::Programming,
            Some("Initial firmware flashed.".to_string()),
        );

        self.db.projects.create(&project).await?;
        info!("Seeded demo project {DEMO_PROJECT_ID}");
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitflow_core::{RequestKind, StageStatus};
    use kitflow_storage::test_utils::memory_pool;
    use pretty_assertions::assert_eq;

    async fn manager() -> ProjectsManager {
        let db = DbState::new(memory_pool().await);
        ProjectsManager::new(
            db,
            Arc::new(Mailer::disabled("shop@kitflow.example")),
            "https://kitflow.example/tracking",
        )
    }

    fn request_input() -> RequestCreateInput {
        RequestCreateInput {
            kind: RequestKind::Project,
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            project_title: Some("Line Follower Bot".to_string()),
            microcontroller: None,
            components: None,
            description: Some("A bot that follows a black line.".to_string()),
            budget: None,
            topic: None,
            audience: None,
            purpose: None,
            style: None,
            instructions: None,
        }
    }

    #[tokio::test]
    async fn submit_then_approve_end_to_end() {
        let manager = manager().await;

        let request = manager.submit_request(request_input()).await.unwrap();
        assert_eq!(manager.pending_requests().await.unwrap().len(), 1);

        let project = manager.approve_request(&request.id).await.unwrap();

        assert_eq!(project.current_stage, StageKey::ComponentsCollected);
        assert_eq!(
            project.stages[&StageKey::ComponentsCollected].status,
            StageStatus::InProgress
        );
        assert_eq!(project.user_email, "asha@example.com");

        // The owning account is stable and derived from the email.
        let owner = manager
            .db()
            .users
            .get_by_email("asha@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.user_id, owner.id);

        // The request is gone.
        assert!(manager.pending_requests().await.unwrap().is_empty());
        assert_eq!(
            manager.projects_for_user(&owner.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn decline_removes_request_without_project() {
        let manager = manager().await;
        let request = manager.submit_request(request_input()).await.unwrap();

        manager.decline_request(&request.id).await.unwrap();

        assert!(manager.pending_requests().await.unwrap().is_empty());
        assert!(manager.list_projects().await.unwrap().is_empty());

        // A second decline is a visible not-found, not a silent no-op.
        let result = manager.decline_request(&request.id).await;
        assert!(matches!(result, Err(ManagerError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_submission_is_rejected_before_persisting() {
        let manager = manager().await;
        let mut input = request_input();
        input.email = String::new();
        input.description = None;

        let result = manager.submit_request(input).await;
        match result {
            Err(ManagerError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "description"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }

        assert!(manager.pending_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn advance_persists_and_repeats_safely() {
        let manager = manager().await;
        let request = manager.submit_request(request_input()).await.unwrap();
        let project = manager.approve_request(&request.id).await.unwrap();

        let advanced = manager
            .advance_project(&project.project_id, StageKey::Testing)
            .await
            .unwrap();
        let first_design_time = advanced.stages[&StageKey::CircuitDesign].timestamp;

        // Re-sending the same target converges and keeps completion times.
        let again = manager
            .advance_project(&project.project_id, StageKey::Testing)
            .await
            .unwrap();
        assert_eq!(again.current_stage, StageKey::Testing);
        assert_eq!(
            again.stages[&StageKey::CircuitDesign].timestamp,
            first_design_time
        );

        let stored = manager
            .get_project(&project.project_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_stage, StageKey::Testing);
    }

    #[tokio::test]
    async fn notes_update_leaves_stage_state_alone() {
        let manager = manager().await;
        let request = manager.submit_request(request_input()).await.unwrap();
        let project = manager.approve_request(&request.id).await.unwrap();

        let updated = manager
            .update_stage_notes(
                &project.project_id,
                StageKey::Shipping,
                Some("Courier booked".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.current_stage, project.current_stage);
        for key in StageKey::ALL {
            assert_eq!(updated.stages[&key].status, project.stages[&key].status);
            assert_eq!(updated.stages[&key].timestamp, project.stages[&key].timestamp);
        }
        assert_eq!(
            updated.stages[&StageKey::Shipping].notes.as_deref(),
            Some("Courier booked")
        );
    }

    #[tokio::test]
    async fn advancing_a_missing_project_is_not_found() {
        let manager = manager().await;
        let result = manager.advance_project("SK-9999", StageKey::Testing).await;
        assert!(matches!(result, Err(ManagerError::NotFound(_))));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let manager = manager().await;
        let first = manager.seed_demo_project().await.unwrap();
        let second = manager.seed_demo_project().await.unwrap();

        assert_eq!(first.project_id, second.project_id);
        assert_eq!(manager.list_projects().await.unwrap().len(), 1);
        assert_eq!(first.current_stage, StageKey::Programming);
    }
}
