//! # KitFlow Core
//!
//! Foundational package providing the domain types shared across all
//! KitFlow packages: the fulfillment stage model, custom-work requests,
//! users, and input validation.

pub mod constants;
pub mod types;
pub mod validator;

// Re-export main types
pub use types::{
    ContactInput, ProjectRequest, RequestCreateInput, RequestKind, Role, Stage, StageKey,
    StageStatus, TrackedProject, User, UserProfileInput,
};

// Re-export constants
pub use constants::{database_file, kitflow_dir, PROJECT_ID_PREFIX, PROJECT_ID_SEED};

// Re-export validation
pub use validator::{validate_contact_input, validate_request_input, ValidationError};
