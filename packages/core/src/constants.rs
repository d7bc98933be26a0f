use std::env;
use std::path::PathBuf;

/// Prefix for human-readable project ids (`SK-1024`).
pub const PROJECT_ID_PREFIX: &str = "SK-";

/// First value handed out by the project id counter.
pub const PROJECT_ID_SEED: i64 = 1000;

/// Get the path to the KitFlow directory (~/.kitflow)
pub fn kitflow_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".kitflow")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .expect("Unable to get home directory")
            .join(".kitflow")
    }
}

/// Get the path to the default database file (~/.kitflow/kitflow.db)
pub fn database_file() -> PathBuf {
    kitflow_dir().join("kitflow.db")
}
