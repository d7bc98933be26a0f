use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origin: String,
    pub database_path: PathBuf,
    /// Public URL of the tracking page, used in approval notices.
    pub tracking_url: String,
    /// Administrator account provisioned at startup, if set.
    pub admin_email: Option<String>,
    pub email: EmailConfig,
}

#[derive(Debug)]
pub struct EmailConfig {
    /// Endpoint of the transactional email API. Unset disables delivery.
    pub api_url: Option<String>,
    pub api_key: String,
    pub from: String,
    pub shop_inbox: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "4001".to_string());

        let port = port_str.parse::<u16>()?;

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let database_path = env::var("KITFLOW_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| kitflow_core::database_file());

        let tracking_url = env::var("KITFLOW_TRACKING_URL")
            .unwrap_or_else(|_| "http://localhost:5173/tracking".to_string());

        let admin_email = env::var("KITFLOW_ADMIN_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let email = EmailConfig {
            api_url: env::var("EMAIL_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "\"KitFlow\" <no-reply@kitflow.example>".to_string()),
            shop_inbox: env::var("EMAIL_SHOP_INBOX")
                .unwrap_or_else(|_| "shop@kitflow.example".to_string()),
        };

        Ok(Config {
            port,
            cors_origin,
            database_path,
            tracking_url,
            admin_email,
            email,
        })
    }
}
