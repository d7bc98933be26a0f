use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::events::ProjectEvents;
use crate::{StorageError, StorageResult};
use kitflow_core::{ProjectRequest, Stage, StageKey, TrackedProject, User, PROJECT_ID_PREFIX};

/// Store for tracked projects.
///
/// Every write persists the whole aggregate; after a successful write
/// the new snapshot goes out on the change feed.
pub struct ProjectStore {
    pool: SqlitePool,
    events: ProjectEvents,
}

impl ProjectStore {
    pub fn new(pool: SqlitePool, events: ProjectEvents) -> Self {
        Self { pool, events }
    }

    pub fn events(&self) -> &ProjectEvents {
        &self.events
    }

    fn parse_timestamp(value: &str, column: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StorageError::Database(format!("Invalid {column} timestamp")))
    }

    fn row_to_project(row: &SqliteRow) -> StorageResult<TrackedProject> {
        let stages_json: String = row.try_get("stages")?;
        let mut stages: BTreeMap<StageKey, Stage> = serde_json::from_str(&stages_json)?;

        // Documents written under the five-stage scheme lack the trailing
        // key; normalize so every canonical stage is present.
        for key in StageKey::ALL {
            stages.entry(key).or_insert_with(Stage::pending);
        }

        let current_stage_str: String = row.try_get("current_stage")?;
        let current_stage = StageKey::parse(&current_stage_str).ok_or_else(|| {
            StorageError::Database(format!("Unknown stage key: {current_stage_str}"))
        })?;

        let created_at_str: String = row.try_get("created_at")?;
        let updated_at_str: String = row.try_get("updated_at")?;

        Ok(TrackedProject {
            project_id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_email: row.try_get("user_email")?,
            title: row.try_get("title")?,
            current_stage,
            stages,
            created_at: Self::parse_timestamp(&created_at_str, "created_at")?,
            updated_at: Self::parse_timestamp(&updated_at_str, "updated_at")?,
        })
    }

    async fn insert_project<'e, E>(executor: E, project: &TrackedProject) -> StorageResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let stages_json = serde_json::to_string(&project.stages)?;

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, user_id, user_email, title, current_stage, stages, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.project_id)
        .bind(&project.user_id)
        .bind(&project.user_email)
        .bind(&project.title)
        .bind(project.current_stage.as_str())
        .bind(&stages_json)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(executor)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    /// Inserts a new project document.
    pub async fn create(&self, project: &TrackedProject) -> StorageResult<()> {
        Self::insert_project(&self.pool, project).await?;
        debug!("Created project {}", project.project_id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<TrackedProject>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> StorageResult<Vec<TrackedProject>> {
        let rows = sqlx::query("SELECT * FROM projects ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(Self::row_to_project(&row)?);
        }

        debug!("Retrieved {} projects", projects.len());
        Ok(projects)
    }

    pub async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<TrackedProject>> {
        let rows = sqlx::query("SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(Self::row_to_project(&row)?);
        }
        Ok(projects)
    }

    /// Overwrites the stored aggregate with `project` and publishes the
    /// new snapshot. The project must already exist.
    pub async fn save(&self, project: &TrackedProject) -> StorageResult<()> {
        let stages_json = serde_json::to_string(&project.stages)?;

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET user_id = ?, user_email = ?, title = ?, current_stage = ?, stages = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&project.user_id)
        .bind(&project.user_email)
        .bind(&project.title)
        .bind(project.current_stage.as_str())
        .bind(&stages_json)
        .bind(project.updated_at.to_rfc3339())
        .bind(&project.project_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.events.publish(project);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    /// Converts an approved request into a new tracked project.
    ///
    /// One transaction covers the id allocation, the project insert, and
    /// the request deletion, so a failure in the middle leaves neither an
    /// orphaned request nor a half-created project. Returns `NotFound`
    /// if the request row is already gone (e.g. another operator just
    /// declined it), rolling back the insert.
    pub async fn create_from_request(
        &self,
        request: &ProjectRequest,
        owner: &User,
        now: DateTime<Utc>,
    ) -> StorageResult<TrackedProject> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let next: i64 = sqlx::query_scalar("SELECT next_value FROM project_id_counter WHERE id = 1")
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        sqlx::query("UPDATE project_id_counter SET next_value = next_value + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        let first_note = format!("Project created from request: {}", request.display_title());
        let project = TrackedProject {
            project_id: format!("{PROJECT_ID_PREFIX}{next}"),
            user_id: owner.id.clone(),
            user_email: request.email.clone(),
            title: request.display_title().to_string(),
            current_stage: StageKey::ALL[0],
            stages: kitflow_tracker::new_project_stages(now, Some(first_note)),
            created_at: now,
            updated_at: now,
        };

        Self::insert_project(&mut *tx, &project).await?;

        let deleted = sqlx::query("DELETE FROM project_requests WHERE id = ?")
            .bind(&request.id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls back the insert and the
            // counter bump.
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(
            "Created project {} from request {}",
            project.project_id, request.id
        );
        self.events.publish(&project);
        Ok(project)
    }
}
