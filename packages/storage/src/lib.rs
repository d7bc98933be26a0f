//! # KitFlow Storage
//!
//! SQLite persistence for projects, requests, users, and sessions, plus
//! a broadcast change feed for live tracking views. Documents with
//! nested structure (the per-stage map) are stored as JSON text columns;
//! everything queried by key gets its own column.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::migrate::MigrateDatabase;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod events;
pub mod projects;
pub mod requests;
pub mod users;

pub use events::ProjectEvents;
pub use projects::ProjectStore;
pub use requests::RequestStore;
pub use users::UserStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found")]
    NotFound,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: kitflow_core::database_file(),
            enable_wal: true,
            max_connections: 10,
            busy_timeout_seconds: 30,
        }
    }
}

/// Opens (creating if necessary) the database at `config.path`, applies
/// the SQLite pragmas, and runs migrations.
pub async fn connect(config: &StorageConfig) -> StorageResult<SqlitePool> {
    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    let database_url = format!("sqlite:{}", config.path.display());

    if !sqlx::Sqlite::database_exists(&database_url)
        .await
        .map_err(StorageError::Sqlx)?
    {
        debug!("Creating database at: {}", database_url);
        sqlx::Sqlite::create_database(&database_url)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.busy_timeout_seconds))
        .connect(&database_url)
        .await
        .map_err(StorageError::Sqlx)?;

    if config.enable_wal {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    migrate(&pool).await?;

    info!("Database ready at {}", config.path.display());
    Ok(pool)
}

/// Runs pending migrations against an existing pool.
pub async fn migrate(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)?;
    debug!("Database migrations completed");
    Ok(())
}

/// Opens a database at an explicit path with default settings.
pub async fn connect_at(path: &Path) -> StorageResult<SqlitePool> {
    connect(&StorageConfig {
        path: path.to_path_buf(),
        ..StorageConfig::default()
    })
    .await
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// In-memory database for tests. A single connection keeps every
    /// query on the same in-memory instance.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        migrate(&pool).await.expect("migrations");
        pool
    }
}
