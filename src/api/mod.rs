mod error;
mod media;
mod response;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::media::MediaHost;
use crate::profile::ProfileService;
use crate::session::SessionManager;

pub use error::ApiError;
pub use response::{ApiResponse, Envelope};
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    media_base_url: &str,
) -> Router {
    let media_host = MediaHost::new(db.clone(), media_base_url);

    let users_state = users::UsersState {
        sessions: SessionManager::new(db.clone(), jwt.clone(), media_host.clone()),
        profiles: ProfileService::new(db.clone(), media_host),
        jwt,
        secure_cookies,
    };

    let media_state = media::MediaState { db };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/media", media::router(media_state))
}
