//! Session lifecycle: registration, login, logout, refresh-token rotation and
//! password changes.
//!
//! Each user has a single `refresh_token` field:
//!
//! - absent: logged out
//! - `T`: logged in, and only `T` may be exchanged for a new token pair
//!
//! Login overwrites the field (the newest session wins), refresh swaps `T` for
//! `T'`, and logout clears it. Multiple concurrent devices per user are not
//! supported; that would need one row per session instead of one field per user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::{Database, NewUser, PublicUser, User, is_unique_violation};
use crate::error::{AccountError, ResultExt};
use crate::jwt::JwtConfig;
use crate::media::{MediaHost, Upload};
use crate::password;

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[serde(skip)]
    pub access_duration: u64,
    /// Refresh token lifetime in seconds
    #[serde(skip)]
    pub refresh_duration: u64,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: PublicUser,
}

/// Login credentials. At least one of `username`/`email` must be non-blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default, rename = "userName", alias = "username")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<Upload>,
    pub cover_image: Option<Upload>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
    media: MediaHost,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, media: MediaHost) -> Self {
        Self { db, jwt, media }
    }

    /// Create an account. Validation happens before anything is written.
    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser, AccountError> {
        let full_name = input.full_name.trim();
        let email = normalize_email(&input.email);
        let username = normalize_username(&input.username);

        if full_name.is_empty()
            || email.is_empty()
            || username.is_empty()
            || input.password.trim().is_empty()
        {
            return Err(AccountError::bad_request("All fields are required"));
        }

        let taken = self
            .db
            .users()
            .is_taken(&username, &email)
            .await
            .db_err("Failed to check existing users")?;
        if taken {
            return Err(AccountError::conflict(
                "User with email or username already exists",
            ));
        }

        let avatar = input
            .avatar
            .ok_or_else(|| AccountError::bad_request("Avatar file is required"))?;

        let avatar_url = self
            .media
            .upload(&avatar)
            .await
            .internal_err("Failed to upload avatar")?;
        let cover_image_url = match &input.cover_image {
            Some(cover) => self
                .media
                .upload(cover)
                .await
                .internal_err("Failed to upload cover image")?,
            None => String::new(),
        };

        let password_hash = hash_password(input.password).await?;
        let uuid = uuid::Uuid::new_v4().to_string();

        let id = self
            .db
            .users()
            .create(&NewUser {
                uuid: &uuid,
                username: &username,
                email: &email,
                full_name,
                password_hash: &password_hash,
                avatar: &avatar_url,
                cover_image: &cover_image_url,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AccountError::conflict("User with email or username already exists")
                } else {
                    tracing::error!("Failed to create user: {}", e);
                    AccountError::internal("Database error")
                }
            })?;

        let user = self
            .db
            .users()
            .get_by_id(id)
            .await
            .db_err("Failed to load created user")?
            .ok_or_else(|| {
                AccountError::internal("Something went wrong while registering the user")
            })?;

        info!(user = %user.uuid, username = %user.username, "User registered");
        Ok(user.into())
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AccountError> {
        let username = input
            .username
            .as_deref()
            .map(normalize_username)
            .filter(|s| !s.is_empty());
        let email = input
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|s| !s.is_empty());

        if username.is_none() && email.is_none() {
            return Err(AccountError::bad_request("Username or email is required"));
        }

        let user = self
            .db
            .users()
            .find_by_username_or_email(username.as_deref(), email.as_deref())
            .await
            .db_err("Failed to look up user")?
            .ok_or_else(|| AccountError::not_found("User does not exist"))?;

        if !check_password(input.password, user.password_hash.clone()).await? {
            return Err(AccountError::unauthorized("Invalid user credentials"));
        }

        let tokens = self.issue_tokens(&user)?;
        self.db
            .users()
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await
            .db_err("Failed to store refresh token")?;

        let user = self
            .db
            .users()
            .get_by_id(user.id)
            .await
            .db_err("Failed to load user")?
            .ok_or_else(|| AccountError::not_found("User does not exist"))?;

        info!(user = %user.uuid, "User logged in");
        Ok(LoginOutcome {
            tokens,
            user: user.into(),
        })
    }

    /// End the caller's session. Clearing an already-absent token is not an error.
    pub async fn logout(&self, user_uuid: &str) -> Result<(), AccountError> {
        let Some(user) = self
            .db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .db_err("Failed to look up user")?
        else {
            return Ok(());
        };

        self.db
            .users()
            .set_refresh_token(user.id, None)
            .await
            .db_err("Failed to clear refresh token")?;

        info!(user = %user.uuid, "User logged out");
        Ok(())
    }

    /// Exchange the live refresh token for a new pair. The presented token is
    /// invalidated; presenting it again fails even before it expires.
    pub async fn refresh(&self, incoming: Option<&str>) -> Result<TokenPair, AccountError> {
        let incoming = incoming
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AccountError::unauthorized("Unauthorized request"))?;

        let claims = self.jwt.validate_refresh_token(incoming).map_err(|e| {
            warn!(error = %e, "Rejected refresh token");
            AccountError::unauthorized("Invalid refresh token")
        })?;

        let user = self
            .db
            .users()
            .get_by_uuid(&claims.sub)
            .await
            .db_err("Failed to look up user")?
            .ok_or_else(|| AccountError::unauthorized("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(incoming) {
            warn!(user = %user.uuid, "Superseded refresh token presented");
            return Err(AccountError::unauthorized(
                "Refresh token is expired or used",
            ));
        }

        let tokens = self.issue_tokens(&user)?;
        let rotated = self
            .db
            .users()
            .rotate_refresh_token(user.id, incoming, &tokens.refresh_token)
            .await
            .db_err("Failed to rotate refresh token")?;
        if !rotated {
            warn!(user = %user.uuid, "Refresh token rotated concurrently");
            return Err(AccountError::unauthorized(
                "Refresh token is expired or used",
            ));
        }

        info!(user = %user.uuid, "Refresh token rotated");
        Ok(tokens)
    }

    /// Replace the password after checking the old one. The session stays valid.
    pub async fn change_password(
        &self,
        user_uuid: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.trim().is_empty() {
            return Err(AccountError::bad_request("New password is required"));
        }

        let user = self
            .db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .db_err("Failed to look up user")?
            .ok_or_else(|| AccountError::not_found("User not found"))?;

        if !check_password(old_password.to_string(), user.password_hash.clone()).await? {
            return Err(AccountError::bad_request("Invalid old password"));
        }

        let hash = hash_password(new_password.to_string()).await?;
        self.db
            .users()
            .set_password_hash(user.id, &hash)
            .await
            .db_err("Failed to update password")?;

        info!(user = %user.uuid, "Password changed");
        Ok(())
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, AccountError> {
        let access = self
            .jwt
            .generate_access_token(&user.uuid, &user.email, &user.username, &user.full_name)
            .internal_err("Something went wrong while generating tokens")?;
        let refresh = self
            .jwt
            .generate_refresh_token(&user.uuid)
            .internal_err("Something went wrong while generating tokens")?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_duration: access.duration,
            refresh_duration: refresh.duration,
        })
    }
}

pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// argon2 is deliberately slow, keep it off the async workers.
async fn hash_password(plain: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .internal_err("Password hashing task failed")?
        .internal_err("Failed to hash password")
}

async fn check_password(plain: String, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .internal_err("Password verification task failed")?
        .internal_err("Failed to verify password")
}
