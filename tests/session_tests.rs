//! Tests for the session lifecycle over HTTP.
//!
//! Tests cover:
//! - Login response shape and token cookies
//! - Refresh-token rotation from cookie and from body
//! - Reuse of superseded refresh tokens
//! - Logout clearing cookies and the stored token
//! - Password change
//! - Access token guard

mod common;

use axum::http::StatusCode;
use common::{
    TestApp, body_json, cookie_request, cookie_value, empty_request, json_request, set_cookies,
};
use serde_json::json;

const PASSWORD: &str = "correct";

#[tokio::test]
async fn test_login_returns_user_and_tokens() {
    let t = TestApp::new().await;
    t.register("alice", PASSWORD).await;

    let response = t.login("alice", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let access_cookie = cookie_value(&response, "accessToken").unwrap();
    let refresh_cookie = cookie_value(&response, "refreshToken").unwrap();
    let cookies = set_cookies(&response);
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.contains("Max-Age=900")));
    assert!(cookies.iter().any(|c| c.contains("Max-Age=864000")));

    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 200);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["user"]["userName"], "alice");
    assert!(json["data"]["user"].get("password").is_none());
    assert!(json["data"]["user"].get("passwordHash").is_none());
    assert!(json["data"]["user"].get("refreshToken").is_none());
    assert_eq!(json["data"]["accessToken"], access_cookie.as_str());
    assert_eq!(json["data"]["refreshToken"], refresh_cookie.as_str());
}

#[tokio::test]
async fn test_login_accepts_lowercase_username_key() {
    let t = TestApp::new().await;
    t.register("alice", PASSWORD).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/users/login",
            &json!({ "username": "alice", "password": PASSWORD }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["userName"], "alice");
}

#[tokio::test]
async fn test_login_errors() {
    let t = TestApp::new().await;
    t.register("alice", PASSWORD).await;

    let response = t.login("alice", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());

    let response = t.login("nobody", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/users/login",
            &json!({ "password": PASSWORD }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_malformed_json_uses_envelope() {
    let t = TestApp::new().await;

    let response = t
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_refresh_from_cookie_rotates() {
    let t = TestApp::new().await;
    let (_, refresh) = t.register_and_login("alice", PASSWORD).await;

    let response = t
        .send(cookie_request(
            "POST",
            "/api/v1/users/refresh-token",
            &format!("refreshToken={}", refresh),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let new_cookie = cookie_value(&response, "refreshToken").unwrap();
    assert_ne!(new_cookie, refresh);

    let json = body_json(response).await;
    assert_eq!(json["data"]["refreshToken"], new_cookie.as_str());
    let access = json["data"]["accessToken"].as_str().unwrap();
    assert!(t.jwt.validate_access_token(access).is_ok());
}

#[tokio::test]
async fn test_refresh_from_body_and_reuse_rejected() {
    let t = TestApp::new().await;
    let (_, refresh) = t.register_and_login("alice", PASSWORD).await;

    let body = json!({ "refreshToken": refresh });
    let response = t
        .send(json_request("POST", "/api/v1/users/refresh-token", &body, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .send(json_request("POST", "/api/v1/users/refresh-token", &body, None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Refresh token is expired or used");
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let t = TestApp::new().await;

    let response = t
        .send(empty_request("POST", "/api/v1/users/refresh-token", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_expired_token() {
    let t = TestApp::new().await;
    let user = t.register("alice", PASSWORD).await;
    let uuid = user["id"].as_str().unwrap();

    let expired = t.jwt.generate_refresh_token_at(uuid, 1_000_000).unwrap();
    let stored = t.db.users().get_by_uuid(uuid).await.unwrap().unwrap();
    t.db.users()
        .set_refresh_token(stored.id, Some(&expired.token))
        .await
        .unwrap();

    let response = t
        .send(cookie_request(
            "POST",
            "/api/v1/users/refresh-token",
            &format!("refreshToken={}", expired.token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["statusCode"], 401);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let t = TestApp::new().await;
    let (access, _) = t.register_and_login("alice", PASSWORD).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/users/refresh-token",
            &json!({ "refreshToken": access }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let t = TestApp::new().await;
    let (access, refresh) = t.register_and_login("alice", PASSWORD).await;

    let response = t
        .send(cookie_request(
            "POST",
            "/api/v1/users/logout",
            &format!("accessToken={}", access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(cookie_value(&response, "refreshToken").as_deref(), Some(""));

    let response = t
        .send(cookie_request(
            "POST",
            "/api/v1/users/refresh-token",
            &format!("refreshToken={}", refresh),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_rejects_missing_and_bad_tokens() {
    let t = TestApp::new().await;
    let (_, refresh) = t.register_and_login("alice", PASSWORD).await;

    let response = t
        .send(empty_request("GET", "/api/v1/users/current-user", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());

    let response = t
        .send(empty_request(
            "GET",
            "/api/v1/users/current-user",
            Some("not-a-token"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A refresh token is signed with the other secret
    let response = t
        .send(empty_request(
            "GET",
            "/api/v1/users/current-user",
            Some(&refresh),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = t
        .send(empty_request("POST", "/api/v1/users/logout", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_flow() {
    let t = TestApp::new().await;
    let (access, _) = t.register_and_login("alice", PASSWORD).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/users/change-password",
            &json!({ "oldPassword": "wrong", "newPassword": "next" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid old password");

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/users/change-password",
            &json!({ "oldPassword": PASSWORD, "newPassword": "next" }),
            Some(&access),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(t.login("alice", "next").await.status(), StatusCode::OK);
    assert_eq!(
        t.login("alice", PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
}
