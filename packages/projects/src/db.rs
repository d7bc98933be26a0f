// ABOUTME: Database connection management and store initialization
// ABOUTME: Provides shared access to the SQLite pool and storage layers

use sqlx::SqlitePool;
use std::sync::Arc;

use kitflow_storage::{ProjectEvents, ProjectStore, RequestStore, StorageConfig, StorageResult, UserStore};

/// Shared database state handed to API handlers.
#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub projects: Arc<ProjectStore>,
    pub requests: Arc<RequestStore>,
    pub users: Arc<UserStore>,
}

impl DbState {
    /// Builds the stores on top of an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        let events = ProjectEvents::new();
        Self {
            projects: Arc::new(ProjectStore::new(pool.clone(), events)),
            requests: Arc::new(RequestStore::new(pool.clone())),
            users: Arc::new(UserStore::new(pool.clone())),
            pool,
        }
    }

    /// Opens the database described by `config` and builds the stores.
    pub async fn init(config: &StorageConfig) -> StorageResult<Self> {
        let pool = kitflow_storage::connect(config).await?;
        Ok(Self::new(pool))
    }
}
