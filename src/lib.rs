pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod jwt;
pub mod media;
pub mod password;
pub mod profile;
pub mod session;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secrets and lifetimes for access and refresh tokens
    pub tokens: TokenSettings,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Prefix for media URLs stored on users. Empty gives host-relative URLs.
    pub media_base_url: String,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.tokens));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.secure_cookies,
        &config.media_base_url,
    );

    Router::new().nest("/api/v1", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}
