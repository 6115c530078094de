//! Authentication error types.

use axum::response::{IntoResponse, Response};

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
}

/// Guard rejection, rendered as the regular 401 envelope.
#[derive(Debug)]
pub struct AuthError(pub AuthErrorKind);

impl AuthError {
    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::NotAuthenticated => "Unauthorized request",
            AuthErrorKind::InvalidToken => "Invalid access token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::unauthorized(self.message()).into_response()
    }
}
