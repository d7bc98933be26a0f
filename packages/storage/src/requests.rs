use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::{StorageError, StorageResult};
use kitflow_core::{ProjectRequest, RequestCreateInput, RequestKind};

/// Store for pending custom-work requests.
pub struct RequestStore {
    pool: SqlitePool,
}

impl RequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn kind_to_string(kind: RequestKind) -> &'static str {
        match kind {
            RequestKind::Project => "project",
            RequestKind::Presentation => "presentation",
        }
    }

    fn row_to_request(row: &SqliteRow) -> StorageResult<ProjectRequest> {
        let kind_str: String = row.try_get("kind")?;
        let kind = match kind_str.as_str() {
            "presentation" => RequestKind::Presentation,
            _ => RequestKind::Project,
        };

        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StorageError::Database("Invalid created_at timestamp".to_string()))?;

        Ok(ProjectRequest {
            id: row.try_get("id")?,
            created_at,
            kind,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            project_title: row.try_get("project_title")?,
            microcontroller: row.try_get("microcontroller")?,
            components: row.try_get("components")?,
            description: row.try_get("description")?,
            budget: row.try_get("budget")?,
            topic: row.try_get("topic")?,
            audience: row.try_get("audience")?,
            purpose: row.try_get("purpose")?,
            style: row.try_get("style")?,
            instructions: row.try_get("instructions")?,
        })
    }

    /// Persists a new request under a store-generated id.
    pub async fn create(&self, input: RequestCreateInput) -> StorageResult<ProjectRequest> {
        let request = ProjectRequest {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            kind: input.kind,
            name: input.name,
            email: input.email,
            project_title: input.project_title,
            microcontroller: input.microcontroller,
            components: input.components,
            description: input.description,
            budget: input.budget,
            topic: input.topic,
            audience: input.audience,
            purpose: input.purpose,
            style: input.style,
            instructions: input.instructions,
        };

        sqlx::query(
            r#"
            INSERT INTO project_requests (
                id, created_at, kind, name, email,
                project_title, microcontroller, components, description, budget,
                topic, audience, purpose, style, instructions
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(request.created_at.to_rfc3339())
        .bind(Self::kind_to_string(request.kind))
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.project_title)
        .bind(&request.microcontroller)
        .bind(&request.components)
        .bind(&request.description)
        .bind(&request.budget)
        .bind(&request.topic)
        .bind(&request.audience)
        .bind(&request.purpose)
        .bind(&request.style)
        .bind(&request.instructions)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        debug!("Created request {} from {}", request.id, request.email);
        Ok(request)
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<ProjectRequest>> {
        let row = sqlx::query("SELECT * FROM project_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_request(&row)?)),
            None => Ok(None),
        }
    }

    /// Pending requests, newest first.
    pub async fn list(&self) -> StorageResult<Vec<ProjectRequest>> {
        let rows = sqlx::query("SELECT * FROM project_requests ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(Self::row_to_request(&row)?);
        }
        Ok(requests)
    }

    pub async fn delete(&self, id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM project_requests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_pool;

    fn input(email: &str) -> RequestCreateInput {
        RequestCreateInput {
            kind: RequestKind::Presentation,
            name: "Ravi".to_string(),
            email: email.to_string(),
            project_title: None,
            microcontroller: None,
            components: None,
            description: None,
            budget: None,
            topic: Some("IoT in agriculture".to_string()),
            audience: Some("Final-year students".to_string()),
            purpose: None,
            style: None,
            instructions: Some("Keep it under 20 slides".to_string()),
        }
    }

    #[tokio::test]
    async fn create_get_round_trip() {
        let store = RequestStore::new(memory_pool().await);
        let created = store.create(input("ravi@example.com")).await.unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.kind, RequestKind::Presentation);
        assert_eq!(fetched.display_title(), "IoT in agriculture");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = RequestStore::new(memory_pool().await);
        let _first = store.create(input("a@example.com")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create(input("b@example.com")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let store = RequestStore::new(memory_pool().await);
        let created = store.create(input("a@example.com")).await.unwrap();

        assert!(store.delete(&created.id).await.unwrap());
        assert!(!store.delete(&created.id).await.unwrap());
    }
}
