//! Authentication user types.

use crate::jwt::AccessClaims;

/// Authenticated user information extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    /// Public user id (the token subject).
    pub fn uuid(&self) -> &str {
        &self.claims.sub
    }
}
