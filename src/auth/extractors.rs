//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;

/// Find the access token: the cookie wins, then `Authorization: Bearer`.
fn access_token(parts: &Parts) -> Option<&str> {
    if let Some(token) = get_cookie(&parts.headers, ACCESS_COOKIE_NAME) {
        if !token.is_empty() {
            return Some(token);
        }
    }

    let value = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for endpoints that require a valid access token.
/// Stateless: the token is checked by signature and expiry only.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = access_token(parts).ok_or(AuthError(AuthErrorKind::NotAuthenticated))?;

        let claims = state.jwt().validate_access_token(token).map_err(|e| {
            tracing::debug!("Rejected access token: {}", e);
            AuthError(AuthErrorKind::InvalidToken)
        })?;

        Ok(Auth(AuthenticatedUser { claims }))
    }
}
