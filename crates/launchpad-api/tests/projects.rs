mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use common::{MAX_ASSET_BYTES, app, body_bytes, project_form};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

#[tokio::test]
async fn create_and_list_published_project() {
    let app = app();
    let (token, creator_id) = app.student("maker@example.com", "M-1").await;

    let form = project_form("Launchpad", true)
        .text("demoUrl", "https://demo.example")
        .file("logo", "image/png", PNG);
    let (status, body) = app.create_project(&token, &form).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let project = &body["data"];
    assert_eq!(project["title"], "Launchpad");
    assert_eq!(project["creatorId"], Value::String(creator_id.clone()));
    assert_eq!(project["tags"], json!(["education", "startups"]));
    assert_eq!(project["isPublished"], true);
    assert_eq!(project["hasLogo"], true);
    assert_eq!(project["hasCover"], false);
    assert_eq!(project["upvotes"], 0);

    let (status, list) = app.get("/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let (_, filtered) = app.get("/projects?category=edtech", None).await;
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
    let (_, filtered) = app.get("/projects?stage=idea", None).await;
    assert!(filtered["data"].as_array().unwrap().is_empty());
    let (_, filtered) = app.get(&format!("/projects?creator={}", creator_id), None).await;
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);

    // logo is served back with its content type
    let id = project["id"].as_str().unwrap();
    let resp = app
        .raw(
            Request::builder()
                .uri(format!("/projects/{}/assets/logo", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(resp).await, PNG);

    let (status, _) = app.get(&format!("/projects/{}/assets/cover", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_stay_private() {
    let app = app();
    let (token, _) = app.student("maker@example.com", "M-1").await;

    let (_, body) = app.create_project(&token, &project_form("Secret", false)).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, list) = app.get("/projects", None).await;
    assert!(list["data"].as_array().unwrap().is_empty());
    let (status, _) = app.get(&format!("/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = app.get("/projects/mine", Some(&token)).await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .request("PUT", &format!("/projects/{}", id), Some(&token), Some(json!({ "publish": true })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let (status, _) = app.get(&format!("/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_required_field_is_named() {
    let app = app();
    let (token, _) = app.student("maker@example.com", "M-1").await;

    let form = common::Multipart::new().text("title", "No category").text("stage", "idea");
    let (status, body) = app.create_project(&token, &form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "category is required");
}

#[tokio::test]
async fn oversized_asset_is_rejected_with_413() {
    let app = app();
    let (token, _) = app.student("maker@example.com", "M-1").await;

    let big = vec![0u8; MAX_ASSET_BYTES + 1];
    let form = project_form("Too big", true).file("cover", "image/png", &big);
    let (status, body) = app.create_project(&token, &form).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);

    let (_, list) = app.get("/projects/mine", Some(&token)).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_creator_may_update_or_delete() {
    let app = app();
    let (owner, _) = app.student("owner@example.com", "O-1").await;
    let (other, _) = app.guest("other@example.com", "Other").await;

    let (_, body) = app.create_project(&owner, &project_form("Mine", true)).await;
    let uri = format!("/projects/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .request("PUT", &uri, Some(&other), Some(json!({ "title": "Stolen" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not allowed to update this project");

    let (status, _) = app.request("DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            "PUT",
            &uri,
            Some(&owner),
            Some(json!({ "title": "Renamed", "tags": ["a", "b"], "demoUrl": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["tags"], json!(["a", "b"]));
    assert_eq!(body["data"]["category"], "EdTech");

    let (status, body) = app.request("DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("PUT", &format!("/projects/{}", uuid::Uuid::new_v4()), Some(&owner), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upvote_toggles_and_notifies_creator_once() {
    let app = app();
    let (owner, _) = app.student("owner@example.com", "O-1").await;
    let (fan, _) = app.guest("fan@example.com", "Fan").await;

    let (_, body) = app.create_project(&owner, &project_form("Rocket", true)).await;
    let uri = format!("/projects/{}/upvote", body["data"]["id"].as_str().unwrap());

    let (status, first) = app.post(&uri, Some(&fan), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"], json!({ "upvoted": true, "upvotes": 1 }));

    let (_, second) = app.post(&uri, Some(&fan), json!({})).await;
    assert_eq!(second["data"], json!({ "upvoted": false, "upvotes": 0 }));

    // own upvote counts but does not notify
    let (_, own) = app.post(&uri, Some(&owner), json!({})).await;
    assert_eq!(own["data"]["upvotes"], 1);

    let (_, notes) = app.get("/notifications", Some(&owner)).await;
    let list = notes["data"]["notifications"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["type"], "project_upvote");
    assert_eq!(list[0]["description"], "Fan upvoted Rocket");
    assert_eq!(notes["data"]["unreadCount"], 1);
}

#[tokio::test]
async fn comments_are_public_to_read_and_notify_creator() {
    let app = app();
    let (owner, _) = app.student("owner@example.com", "O-1").await;
    let (guest, guest_id) = app.guest("guest@example.com", "Gina").await;

    let (_, body) = app.create_project(&owner, &project_form("Chatty", true)).await;
    let uri = format!("/projects/{}/comments", body["data"]["id"].as_str().unwrap());

    let (status, body) = app.post(&uri, Some(&guest), json!({ "text": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message text cannot be empty");

    let (status, created) = app.post(&uri, Some(&guest), json!({ "text": "Love it" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["author"]["id"], Value::String(guest_id));

    let (status, _) = app.post(&uri, None, json!({ "text": "anon" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, comments) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments["data"][0]["text"], "Love it");

    let (_, count) = app.get("/notifications/unread-count", Some(&owner)).await;
    assert_eq!(count["data"]["count"], 1);
}
