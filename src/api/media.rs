//! Serves stored avatars and cover images.
//!
//! - GET `/{uuid}` - Raw bytes with the stored content type

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
    routing::get,
};
use super::error::ApiError;
use crate::db::Database;
use crate::error::ResultExt;

#[derive(Clone)]
pub struct MediaState {
    pub db: Database,
}

pub fn router(state: MediaState) -> Router {
    Router::new()
        .route("/{uuid}", get(get_media))
        .with_state(state)
}

async fn get_media(
    State(state): State<MediaState>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let media = state
        .db
        .media()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to get media")?
        .ok_or_else(|| ApiError::not_found("Media not found"))?;

    let content_type = HeaderValue::from_str(&media.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    // Media ids are never reused, a stored blob never changes
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    // Opened directly, a blob must not run anything on this origin
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; sandbox"),
    );

    Ok((headers, Body::from(media.data)))
}
