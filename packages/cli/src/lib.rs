use axum::http::Method;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub mod config;

use config::Config;
use kitflow_api::ApiState;
use kitflow_notify::{Mailer, MailerConfig};
use kitflow_projects::{DbState, ProjectsManager};
use kitflow_storage::StorageConfig;

pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let db = DbState::init(&StorageConfig {
        path: config.database_path.clone(),
        ..StorageConfig::default()
    })
    .await?;

    // Provision the administrator account before serving requests.
    match &config.admin_email {
        Some(email) => {
            db.users.ensure_admin(email).await?;
        }
        None => warn!("KITFLOW_ADMIN_EMAIL not set; no administrator will be provisioned"),
    }

    let mailer = match config.email.api_url.clone() {
        Some(api_url) => Arc::new(Mailer::new(MailerConfig {
            api_url,
            api_key: config.email.api_key.clone(),
            from: config.email.from.clone(),
            shop_inbox: config.email.shop_inbox.clone(),
        })),
        None => Arc::new(Mailer::disabled(config.email.shop_inbox.clone())),
    };

    let manager = Arc::new(ProjectsManager::new(
        db.clone(),
        mailer,
        config.tracking_url.clone(),
    ));

    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    // Create the router with CORS and request tracing
    let app = kitflow_api::create_router(ApiState::new(db, manager))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors);

    // Create socket address
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
