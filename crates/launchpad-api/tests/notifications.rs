mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, app, project_form};

/// Owner gets one notification per fan upvote.
async fn owner_with_notifications(app: &TestApp, fans: usize) -> String {
    let (owner, _) = app.student("owner@example.com", "O-1").await;
    let (_, body) = app.create_project(&owner, &project_form("Popular", true)).await;
    let uri = format!("/projects/{}/upvote", body["data"]["id"].as_str().unwrap());

    for i in 0..fans {
        let (fan, _) = app.guest(&format!("fan{}@example.com", i), &format!("Fan {}", i)).await;
        app.post(&uri, Some(&fan), json!({})).await;
    }
    owner
}

#[tokio::test]
async fn mark_one_then_all_read() {
    let app = app();
    let owner = owner_with_notifications(&app, 3).await;

    let (_, notes) = app.get("/notifications", Some(&owner)).await;
    assert_eq!(notes["data"]["unreadCount"], 3);
    let list = notes["data"]["notifications"].as_array().unwrap();
    // newest first
    assert_eq!(list[0]["description"], "Fan 2 upvoted Popular");
    let first_id = list[0]["id"].as_str().unwrap().to_string();

    let uri = format!("/notifications/{}/mark-read", first_id);
    for _ in 0..2 {
        let (status, body) = app.post(&uri, Some(&owner), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isRead"], true);
    }
    let (_, count) = app.get("/notifications/unread-count", Some(&owner)).await;
    assert_eq!(count["data"]["count"], 2);

    let (_, all) = app.post("/notifications/mark-all-read", Some(&owner), json!({})).await;
    assert_eq!(all["data"]["updated"], 2);
    let (_, count) = app.get("/notifications/unread-count", Some(&owner)).await;
    assert_eq!(count["data"]["count"], 0);
}

#[tokio::test]
async fn other_users_notifications_are_not_found() {
    let app = app();
    let owner = owner_with_notifications(&app, 1).await;
    let (stranger, _) = app.guest("stranger@example.com", "Stranger").await;

    let (_, notes) = app.get("/notifications", Some(&owner)).await;
    let id = notes["data"]["notifications"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/notifications/{}/mark-read", id), Some(&stranger), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Notification not found");

    let (status, _) = app
        .request("DELETE", &format!("/notifications/{}", id), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // still there and still unread for the owner
    let (_, count) = app.get("/notifications/unread-count", Some(&owner)).await;
    assert_eq!(count["data"]["count"], 1);

    let (status, body) = app
        .request("DELETE", &format!("/notifications/{}", id), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (_, notes) = app.get("/notifications", Some(&owner)).await;
    assert!(notes["data"]["notifications"].as_array().unwrap().is_empty());
}
