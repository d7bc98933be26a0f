//! # KitFlow Projects
//!
//! The operation layer tying storage and notification together:
//! customers submit requests, operators approve or decline them, and
//! approved projects move through the fulfillment stages.

pub mod db;
pub mod manager;

// Re-export main types from core
pub use kitflow_core::{
    ContactInput, ProjectRequest, RequestCreateInput, RequestKind, Role, Stage, StageKey,
    StageStatus, TrackedProject, User, UserProfileInput, ValidationError,
};

// Re-export manager types
pub use manager::{ManagerError, ManagerResult, ProjectsManager};

// Re-export database state
pub use db::DbState;

// Re-export storage types used by API handlers
pub use kitflow_storage::{
    ProjectEvents, ProjectStore, RequestStore, StorageConfig, StorageError, StorageResult,
    UserStore,
};

// Re-export tracker functions
pub use kitflow_tracker::{advance_stage, progress_percentage, update_image, update_notes};
