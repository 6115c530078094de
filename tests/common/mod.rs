#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use serde_json::Value;
use tower::ServiceExt;
use tubehouse::{ServerConfig, create_app, db::Database, jwt::JwtConfig, jwt::TokenSettings};

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

pub const BOUNDARY: &str = "tubehouse-test-boundary";

/// Stand-in image bytes, only the content type is checked.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n0000";

pub fn token_settings() -> TokenSettings {
    TokenSettings {
        access_secret: ACCESS_SECRET.to_vec(),
        access_duration: 15 * 60,
        refresh_secret: REFRESH_SECRET.to_vec(),
        refresh_duration: 10 * 24 * 60 * 60,
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig {
            db: db.clone(),
            tokens: token_settings(),
            secure_cookies: false,
            media_base_url: String::new(),
        };
        Self {
            app: create_app(&config),
            db,
            jwt: JwtConfig::new(&token_settings()),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Register through the API with an avatar and return the created user.
    pub async fn register(&self, username: &str, password: &str) -> Value {
        let body = Multipart::new()
            .text("fullName", "Test User")
            .text("email", &format!("{}@example.com", username))
            .text("userName", username)
            .text("password", password)
            .file("avatar", "avatar.png", "image/png", PNG)
            .finish();
        let response = self
            .send(multipart_request("POST", "/api/v1/users/register", body, None))
            .await;
        assert_eq!(response.status(), 201, "registration failed");
        body_json(response).await["data"].clone()
    }

    /// Log in by username and return the whole response.
    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        let body = serde_json::json!({ "userName": username, "password": password });
        self.send(json_request("POST", "/api/v1/users/login", &body, None))
            .await
    }

    /// Register and log in, returning (access token, refresh token).
    pub async fn register_and_login(&self, username: &str, password: &str) -> (String, String) {
        self.register(username, password).await;
        let response = self.login(username, password).await;
        assert_eq!(response.status(), 200, "login failed");
        let json = body_json(response).await;
        (
            json["data"]["accessToken"].as_str().unwrap().to_string(),
            json["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: &Value,
    access_token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = access_token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, access_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = access_token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn cookie_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    body: Vec<u8>,
    access_token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = access_token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` header values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the named cookie among the `Set-Cookie` headers.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|c| {
        let (pair, _) = c.split_once(';').unwrap_or((c.as_str(), ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Minimal multipart/form-data body builder.
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}
