// Shared helpers for the HTTP-level tests. Each test drives the full router
// with tower::ServiceExt::oneshot against an in-memory database.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use launchpad_api::identity::CivicVerifier;
use launchpad_api::tokens::TokenKeys;
use launchpad_api::{AppState, AppStateInner, Settings, router};
use launchpad_db::Database;

pub const CIVIC_SECRET: &str = "civic-test-secret";
pub const CIVIC_ISSUER: &str = "civic";
/// Small asset ceiling so the oversized-upload test stays cheap.
pub const MAX_ASSET_BYTES: usize = 64 * 1024;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn app() -> TestApp {
    let db = Database::open_in_memory().expect("in-memory database");
    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenKeys::new("integration-secret", chrono::Duration::hours(1)),
        identity: Some(Box::new(CivicVerifier::new(CIVIC_SECRET, Some(CIVIC_ISSUER)))),
        settings: Settings {
            cookie_secure: false,
            max_asset_bytes: MAX_ASSET_BYTES,
        },
    });

    TestApp {
        router: router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn raw(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("router is infallible")
    }

    /// Send a JSON request and decode the JSON response.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.raw(req).await;
        let status = resp.status();
        (status, json_body(resp).await)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    /// Register a student and return `(token, user id)`.
    pub async fn student(&self, email: &str, matric: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "fullName": format!("Student {}", matric),
                    "email": email,
                    "password": "correct-horse",
                    "role": "student",
                    "matricNumber": matric,
                    "course": "Computer Science",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        credentials(&body)
    }

    /// Register a guest and return `(token, user id)`.
    pub async fn guest(&self, email: &str, name: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "fullName": name,
                    "email": email,
                    "password": "correct-horse",
                    "role": "guest",
                    "organization": "Acme Ventures",
                    "position": "Partner",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        credentials(&body)
    }

    /// Create a project through the multipart endpoint.
    pub async fn create_project(&self, token: &str, form: &Multipart) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/projects/create")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, form.content_type())
            .body(Body::from(form.body()))
            .unwrap();
        let resp = self.raw(req).await;
        let status = resp.status();
        (status, json_body(resp).await)
    }
}

fn credentials(body: &Value) -> (String, String) {
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
    )
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = body_bytes(resp).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
}

/// Minimal multipart/form-data body builder.
pub struct Multipart {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self {
            boundary: "launchpad-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn body(&self) -> Vec<u8> {
        let mut body = self.body.clone();
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body
    }
}

/// A complete, publishable project form.
pub fn project_form(title: &str, publish: bool) -> Multipart {
    Multipart::new()
        .text("title", title)
        .text("tagline", "Ship it")
        .text("problem", "Students cannot find investors")
        .text("solution", "A showcase")
        .text("targetMarket", "Universities")
        .text("category", "EdTech")
        .text("stage", "mvp")
        .text("tags", "education, startups")
        .text("publish", if publish { "true" } else { "false" })
}
