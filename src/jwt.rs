//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with independent secrets and carry
//! independent lifetimes, so leaking one secret does not let an attacker mint
//! the other token class.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, never stored
    Access,
    /// Long-lived refresh token - mirrored on the user record
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user UUID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. Kept minimal since every refresh loads the user anyway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Random id so two tokens minted in the same second never collide
    pub jti: String,
    /// Subject (user UUID)
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Secrets and lifetimes for both token classes.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_duration: u64,
    pub refresh_secret: Vec<u8>,
    /// Refresh token lifetime in seconds
    pub refresh_duration: u64,
}

/// Signing and verification keys for access and refresh tokens.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_duration: u64,
    refresh_duration: u64,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of generating a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

impl JwtConfig {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&settings.access_secret),
            access_decoding: DecodingKey::from_secret(&settings.access_secret),
            refresh_encoding: EncodingKey::from_secret(&settings.refresh_secret),
            refresh_decoding: DecodingKey::from_secret(&settings.refresh_secret),
            access_duration: settings.access_duration,
            refresh_duration: settings.refresh_duration,
        }
    }

    /// Generate an access token carrying enough identity to skip a user lookup per request.
    pub fn generate_access_token(
        &self,
        user_uuid: &str,
        email: &str,
        username: &str,
        full_name: &str,
    ) -> Result<AccessTokenResult, JwtError> {
        self.generate_access_token_at(user_uuid, email, username, full_name, now()?)
    }

    /// Same as [`generate_access_token`](Self::generate_access_token) with an explicit issue time.
    pub fn generate_access_token_at(
        &self,
        user_uuid: &str,
        email: &str,
        username: &str,
        full_name: &str,
        issued_at: u64,
    ) -> Result<AccessTokenResult, JwtError> {
        let claims = AccessClaims {
            sub: user_uuid.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            token_type: TokenType::Access,
            iat: issued_at,
            exp: expires(issued_at, self.access_duration)?,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: self.access_duration,
        })
    }

    /// Generate a refresh token for a user.
    pub fn generate_refresh_token(&self, user_uuid: &str) -> Result<RefreshTokenResult, JwtError> {
        self.generate_refresh_token_at(user_uuid, now()?)
    }

    /// Same as [`generate_refresh_token`](Self::generate_refresh_token) with an explicit issue time.
    pub fn generate_refresh_token_at(
        &self,
        user_uuid: &str,
        issued_at: u64,
    ) -> Result<RefreshTokenResult, JwtError> {
        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_uuid.to_string(),
            token_type: TokenType::Refresh,
            iat: issued_at,
            exp: expires(issued_at, self.refresh_duration)?,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            duration: self.refresh_duration,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = decode(token, &self.access_decoding)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Validate and decode a refresh token. Checks signature and expiry only,
    /// whether the token is still the live one is up to the caller.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = decode(token, &self.refresh_decoding)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }
}

fn decode<T: serde::de::DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    jsonwebtoken::decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(JwtError::Decoding)
}

fn expires(issued_at: u64, duration: u64) -> Result<u64, JwtError> {
    issued_at
        .checked_add(duration)
        .ok_or(JwtError::LifetimeOverflow)
}

fn now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    Encoding(jsonwebtoken::errors::Error),
    Decoding(jsonwebtoken::errors::Error),
    TimeError,
    /// Expiry does not fit in a Unix timestamp
    LifetimeOverflow,
    /// e.g. a refresh token presented where an access token is expected
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::LifetimeOverflow => write!(f, "Token lifetime is too long"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
