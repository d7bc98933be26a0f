// ABOUTME: User storage layer using SQLite
// ABOUTME: Handles user records, role provisioning, and opaque session tokens

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{StorageError, StorageResult};
use kitflow_core::{Role, User, UserProfileInput};

/// Store for user records and their opaque session tokens.
///
/// Users are keyed by a server-generated id; the email is a unique
/// lookup key for sign-in and provisioning but never travels onto other
/// documents as the owner reference.
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn role_to_string(role: Role) -> &'static str {
        match role {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }

    fn parse_timestamp(value: &str, column: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| StorageError::Database(format!("Invalid {column} timestamp")))
    }

    fn row_to_user(row: &SqliteRow) -> StorageResult<User> {
        let role_str: String = row.try_get("role")?;
        let role = match role_str.as_str() {
            "admin" => Role::Admin,
            _ => Role::Customer,
        };

        let created_at_str: String = row.try_get("created_at")?;
        let updated_at_str: String = row.try_get("updated_at")?;
        let last_login_at = row
            .try_get::<Option<String>, _>("last_login_at")?
            .map(|s| Self::parse_timestamp(&s, "last_login_at"))
            .transpose()?;

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            photo_url: row.try_get("photo_url")?,
            role,
            created_at: Self::parse_timestamp(&created_at_str, "created_at")?,
            updated_at: Self::parse_timestamp(&updated_at_str, "updated_at")?,
            last_login_at,
        })
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_user(
        &self,
        email: &str,
        name: &str,
        photo_url: Option<&str>,
        role: Role,
        last_login_at: Option<DateTime<Utc>>,
    ) -> StorageResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            photo_url: photo_url.map(str::to_string),
            role,
            created_at: now,
            updated_at: now,
            last_login_at,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, photo_url, role, created_at, updated_at, last_login_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.photo_url)
        .bind(Self::role_to_string(user.role))
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .bind(user.last_login_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(user)
    }

    /// Records a sign-in from the authentication provider: updates the
    /// profile fields and the login time for a known email, creates the
    /// record otherwise. The stored role is never touched here.
    pub async fn upsert_signin(
        &self,
        email: &str,
        name: &str,
        photo_url: Option<&str>,
    ) -> StorageResult<User> {
        let now = Utc::now();

        if let Some(existing) = self.get_by_email(email).await? {
            sqlx::query(
                r#"
                UPDATE users
                SET name = ?, photo_url = ?, updated_at = ?, last_login_at = ?
                WHERE id = ?
                "#,
            )
            .bind(name)
            .bind(photo_url)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(&existing.id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

            return self.get(&existing.id).await?.ok_or(StorageError::NotFound);
        }

        debug!("First sign-in for {}", email);
        self.insert_user(email, name, photo_url, Role::Customer, Some(now))
            .await
    }

    /// Returns the user owning `email`, creating a customer record when
    /// none exists yet (e.g. approving a request from someone who has
    /// not signed in).
    pub async fn ensure_user_for_email(&self, email: &str, name: &str) -> StorageResult<User> {
        if let Some(existing) = self.get_by_email(email).await? {
            return Ok(existing);
        }
        self.insert_user(email, name, None, Role::Customer, None)
            .await
    }

    /// Updates the caller's own profile fields.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UserProfileInput,
    ) -> StorageResult<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                photo_url = COALESCE(?, photo_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.photo_url)
        .bind(now.to_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get(user_id).await?.ok_or(StorageError::NotFound)
    }

    /// Provisioning: sets the stored role of a user.
    pub async fn set_role(&self, user_id: &str, role: Role) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(Self::role_to_string(role))
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        info!("Set role {} for user {}", role, user_id);
        Ok(())
    }

    /// Startup provisioning: guarantees the configured administrator
    /// account exists and carries the admin role.
    pub async fn ensure_admin(&self, email: &str) -> StorageResult<User> {
        if let Some(existing) = self.get_by_email(email).await? {
            if existing.role != Role::Admin {
                self.set_role(&existing.id, Role::Admin).await?;
            }
            return self.get(&existing.id).await?.ok_or(StorageError::NotFound);
        }

        info!("Provisioning administrator account for {}", email);
        self.insert_user(email, "Administrator", None, Role::Admin, None)
            .await
    }

    /// Issues an opaque session token for a signed-in user.
    pub async fn create_session(&self, user_id: &str) -> StorageResult<String> {
        let token = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(token)
    }

    /// Resolves a bearer token to its user, if the session is live.
    pub async fn get_by_token(&self, token: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT users.* FROM users
            JOIN sessions ON sessions.user_id = users.id
            WHERE sessions.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, token: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}
