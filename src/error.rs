//! Failure values returned by the session and profile services.
//!
//! Services never build HTTP responses themselves; the API layer converts an
//! [`AccountError`] into the response envelope exactly once.

use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Missing or blank input, wrong old password
    BadRequest(String),
    /// Bad credentials, missing/invalid/stale token
    Unauthorized(String),
    NotFound(String),
    /// Duplicate username or email
    Conflict(String),
    /// Storage, hashing or signing failure. The cause is logged, not exposed.
    Internal(String),
}

impl AccountError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AccountError {}

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    /// Log a storage failure and hide it behind a generic message.
    fn db_err(self, context: &str) -> Result<T, AccountError>;
    /// Log any other unexpected failure and report `context` to the caller.
    fn internal_err(self, context: &str) -> Result<T, AccountError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, context: &str) -> Result<T, AccountError> {
        self.map_err(|e| {
            error!("{}: {}", context, e);
            AccountError::internal("Database error")
        })
    }

    fn internal_err(self, context: &str) -> Result<T, AccountError> {
        self.map_err(|e| {
            error!("{}: {}", context, e);
            AccountError::internal(context)
        })
    }
}
