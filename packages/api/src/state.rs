use std::sync::Arc;

use kitflow_projects::{DbState, ProjectsManager};

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbState,
    pub manager: Arc<ProjectsManager>,
}

impl ApiState {
    pub fn new(db: DbState, manager: Arc<ProjectsManager>) -> Self {
        Self { db, manager }
    }
}
