//! User account endpoints.
//!
//! - POST `/register` - Create an account (multipart, avatar required)
//! - POST `/login` - Verify credentials, set both token cookies
//! - POST `/logout` - Drop the stored refresh token and clear cookies
//! - POST `/refresh-token` - Rotate the refresh token (cookie or JSON body)
//! - POST `/change-password` - Replace the password
//! - GET `/current-user` - The caller's own profile
//! - PATCH `/update-account` - Change full name and email
//! - PATCH `/avatar`, PATCH `/cover-image` - Replace an image (multipart)
//! - GET `/c/{username}` - Channel profile with subscription counts
//! - POST `/c/{username}/subscription` - Toggle the caller's subscription

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{HeaderMap, HeaderName, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::response::ApiResponse;
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, set_cookie,
};
use crate::db::PublicUser;
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::media::{IMAGE_TYPES, MAX_UPLOAD_BYTES, Upload};
use crate::profile::{ChannelProfile, ProfileService};
use crate::session::{LoginInput, RegisterInput, SessionManager, TokenPair};

#[derive(Clone)]
pub struct UsersState {
    pub sessions: SessionManager,
    pub profiles: ProfileService,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
        .route("/c/{username}", get(channel_profile))
        .route("/c/{username}/subscription", post(toggle_subscription))
        // Two images plus the text fields
        .layer(DefaultBodyLimit::max(2 * MAX_UPLOAD_BYTES + 64 * 1024))
        .with_state(state)
}

// --- Request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
struct SubscriptionResponse {
    subscribed: bool,
}

#[derive(Serialize)]
struct Empty {}

// --- Helpers ---

type CookieHeaders = AppendHeaders<[(HeaderName, String); 2]>;

fn token_cookies(tokens: &TokenPair, secure: bool) -> CookieHeaders {
    AppendHeaders([
        (
            SET_COOKIE,
            set_cookie(
                ACCESS_COOKIE_NAME,
                &tokens.access_token,
                tokens.access_duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            set_cookie(
                REFRESH_COOKIE_NAME,
                &tokens.refresh_token,
                tokens.refresh_duration,
                secure,
            ),
        ),
    ])
}

/// Read an uploaded image. An empty file counts as no file.
async fn read_image(field: Field<'_>) -> Result<Option<Upload>, ApiError> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field.bytes().await?;

    if data.is_empty() {
        return Ok(None);
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "Uploaded file is larger than {} bytes",
            MAX_UPLOAD_BYTES
        )));
    }
    if !IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::bad_request(
            "Only PNG, JPEG, GIF and WebP images are accepted",
        ));
    }

    Ok(Some(Upload {
        content_type,
        data: data.to_vec(),
    }))
}

/// Pull a single named image out of a multipart body, ignoring other fields.
async fn single_image(mut multipart: Multipart, name: &str) -> Result<Option<Upload>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(name) {
            upload = read_image(field).await?;
        }
    }
    Ok(upload)
}

// --- Handlers ---

/// Expected fields:
/// - `fullName`, `email`, `userName`, `password`: text
/// - `avatar`: image file, required
/// - `coverImage`: image file, optional
async fn register(
    State(state): State<UsersState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let mut input = RegisterInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "fullName" => input.full_name = field.text().await?,
            "email" => input.email = field.text().await?,
            "userName" | "username" => input.username = field.text().await?,
            "password" => input.password = field.text().await?,
            "avatar" => input.avatar = read_image(field).await?,
            "coverImage" => input.cover_image = read_image(field).await?,
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let user = state.sessions.register(input).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

async fn login(
    State(state): State<UsersState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let outcome = state.sessions.login(input).await?;

    Ok((
        token_cookies(&outcome.tokens, state.secure_cookies),
        ApiResponse::ok(
            LoginResponse {
                user: outcome.user,
                access_token: outcome.tokens.access_token,
                refresh_token: outcome.tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

async fn logout(
    State(state): State<UsersState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(auth.uuid()).await?;

    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies)),
        ]),
        ApiResponse::ok(Empty {}, "User logged out"),
    ))
}

/// The cookie wins over the body. A malformed body is treated as absent.
async fn refresh_token(
    State(state): State<UsersState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|r| r.refresh_token);
    let incoming = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .or(from_body.as_deref());

    let tokens = state.sessions.refresh(incoming).await?;

    Ok((
        token_cookies(&tokens, state.secure_cookies),
        ApiResponse::ok(tokens, "Access token refreshed"),
    ))
}

async fn change_password(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    state
        .sessions
        .change_password(auth.uuid(), &payload.old_password, &payload.new_password)
        .await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

async fn current_user(
    State(state): State<UsersState>,
    Auth(auth): Auth,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user = state.profiles.current_user(auth.uuid()).await?;
    Ok(ApiResponse::ok(user, "User fetched successfully"))
}

async fn update_account(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let Json(payload) = payload?;
    let user = state
        .profiles
        .update_account(auth.uuid(), &payload.full_name, &payload.email)
        .await?;

    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

async fn update_avatar(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let upload = single_image(multipart?, "avatar").await?;
    let user = state.profiles.update_avatar(auth.uuid(), upload).await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let upload = single_image(multipart?, "coverImage").await?;
    let user = state
        .profiles
        .update_cover_image(auth.uuid(), upload)
        .await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

async fn channel_profile(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let channel = state
        .profiles
        .channel_profile(&username, Some(auth.uuid()))
        .await?;
    Ok(ApiResponse::ok(channel, "User channel fetched successfully"))
}

async fn toggle_subscription(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subscribed = state
        .profiles
        .toggle_subscription(auth.uuid(), &username)
        .await?;

    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(SubscriptionResponse { subscribed }, message))
}
