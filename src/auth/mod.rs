//! Access-token authentication for API handlers.
//!
//! Access tokens are stateless: a request is authenticated by signature and
//! expiry alone. Refresh tokens are never accepted here, they only go to the
//! refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::Auth;
pub use state::HasAuthState;
pub use types::AuthenticatedUser;
