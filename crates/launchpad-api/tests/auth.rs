mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use common::{CIVIC_ISSUER, CIVIC_SECRET, app, json_body};

fn civic_assertion(sub: &str, email: Option<&str>, name: Option<&str>) -> String {
    let claims = json!({
        "sub": sub,
        "email": email,
        "name": name,
        "iss": CIVIC_ISSUER,
        "exp": chrono::Utc::now().timestamp() + 600,
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(CIVIC_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn register_returns_user_token_and_cookie() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "fullName": "Ada Obi",
                "email": "Ada@Example.com",
                "password": "correct-horse",
                "role": "student",
                "matricNumber": "CSC/2021/001",
                "course": "Computer Science",
            })
            .to_string(),
        ))
        .unwrap();

    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    let user = &body["data"]["user"];
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["role"], "student");
    assert_eq!(user["matricNumber"], "CSC/2021/001");
    assert_eq!(user["isVerified"], false);
    assert!(user.get("passwordHash").is_none());
    assert!(body["data"]["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn duplicate_email_is_rejected_whatever_the_case() {
    let app = app();
    app.guest("dup@example.com", "First").await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "fullName": "Second",
                "email": "DUP@example.com",
                "password": "another-pass",
                "role": "guest",
                "organization": "Org",
                "position": "CTO",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "An account with this email already exists");
}

#[tokio::test]
async fn role_specific_fields_are_required() {
    let app = app();

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "fullName": "No Course",
                "email": "nc@example.com",
                "password": "correct-horse",
                "role": "student",
                "matricNumber": "M-1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "course is required");

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "fullName": "Short",
                "email": "short@example.com",
                "password": "short",
                "role": "guest",
                "organization": "Org",
                "position": "CTO",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_matric_number_conflicts() {
    let app = app();
    app.student("one@example.com", "MAT-7").await;

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({
                "fullName": "Two",
                "email": "two@example.com",
                "password": "correct-horse",
                "role": "student",
                "matricNumber": "MAT-7",
                "course": "Law",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_by_email_or_matric_number() {
    let app = app();
    app.student("login@example.com", "MAT-42").await;

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "LOGIN@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["user"]["lastLogin"].is_string());

    // the echoed timestamp is the stored one
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let (_, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(me["data"]["user"]["lastLogin"], body["data"]["user"]["lastLogin"]);

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "identifier": "MAT-42", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "login@example.com");
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let app = app();
    app.guest("known@example.com", "Known").await;

    let (unknown_status, unknown_body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "correct-horse" }),
        )
        .await;
    let (wrong_status, wrong_body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "known@example.com", "password": "wrong-horse" }),
        )
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(wrong_body["message"], "Invalid credentials");
}

#[tokio::test]
async fn me_accepts_bearer_or_cookie() {
    let app = app();
    let (token, id) = app.guest("me@example.com", "Me").await;

    let (status, body) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], Value::String(id.clone()));

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["user"]["id"], Value::String(id));

    let (status, body) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/auth/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::COOKIE, "token=abc")
        .body(Body::empty())
        .unwrap();
    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token=;"), "{}", cookie);
    assert_eq!(json_body(resp).await["data"]["loggedOut"], true);
}

#[tokio::test]
async fn civic_login_creates_then_reuses_a_verified_account() {
    let app = app();
    let assertion = civic_assertion("did:civic:123", Some("Civic@Example.com"), Some("Cee Vic"));

    let (status, first) = app.post("/auth/civic", None, json!({ "assertion": assertion })).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    let user = &first["data"]["user"];
    assert_eq!(user["email"], "civic@example.com");
    assert_eq!(user["fullName"], "Cee Vic");
    assert_eq!(user["role"], "guest");
    assert_eq!(user["isVerified"], true);

    let again = civic_assertion("did:civic:123", None, None);
    let (status, second) = app.post("/auth/civic", None, json!({ "assertion": again })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["user"]["id"], first["data"]["user"]["id"]);

    // provider-only account has no password to log in with
    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "civic@example.com", "password": "anything-at-all" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn civic_login_links_existing_email_account() {
    let app = app();
    let (_, id) = app.student("linked@example.com", "MAT-9").await;

    let assertion = civic_assertion("did:civic:link", Some("linked@example.com"), None);
    let (status, body) = app.post("/auth/civic", None, json!({ "assertion": assertion })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], Value::String(id));
    assert_eq!(body["data"]["user"]["role"], "student");
    assert_eq!(body["data"]["user"]["isVerified"], true);

    // the password still works after linking
    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "linked@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn civic_login_does_not_relink_to_a_second_subject() {
    let app = app();
    let first = civic_assertion("did:civic:first", Some("owner@example.com"), None);
    let (status, owner) = app.post("/auth/civic", None, json!({ "assertion": first })).await;
    assert_eq!(status, StatusCode::OK);

    let other = civic_assertion("did:civic:other", Some("owner@example.com"), None);
    let (status, body) = app.post("/auth/civic", None, json!({ "assertion": other })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let first = civic_assertion("did:civic:first", None, None);
    let (status, again) = app.post("/auth/civic", None, json!({ "assertion": first })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["user"]["id"], owner["data"]["user"]["id"]);
}

#[tokio::test]
async fn forged_civic_assertion_is_rejected() {
    let app = app();
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": "did:civic:evil", "iss": CIVIC_ISSUER, "exp": chrono::Utc::now().timestamp() + 600 }),
        &EncodingKey::from_secret(b"not-the-secret"),
    )
    .unwrap();

    let (status, body) = app.post("/auth/civic", None, json!({ "assertion": forged })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn public_profile_lookup() {
    let app = app();
    let (_, id) = app.guest("profile@example.com", "Pro File").await;

    let (status, body) = app.get(&format!("/users/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Pro File");
    assert_eq!(body["data"]["organization"], "Acme Ventures");

    let (status, body) = app.get(&format!("/users/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["success"], false);
}
