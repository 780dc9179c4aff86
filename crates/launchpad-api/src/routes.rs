use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, messages, notifications, projects, users};

/// Room for the text fields and multipart framing around two images.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let upload_limit = 2 * state.settings.max_asset_bytes + FORM_OVERHEAD;

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/civic", post(auth::civic))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users/{id}", get(users::get_profile))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}/comments", get(projects::list_comments))
        .route("/projects/{id}/assets/{kind}", get(projects::get_asset));

    let protected_routes = Router::new()
        .route("/messages", post(messages::send))
        .route("/messages/conversations", get(messages::conversations))
        .route("/messages/unread-count", get(messages::unread))
        .route("/messages/read", put(messages::mark_read))
        .route("/messages/{user_id}", get(messages::thread))
        .route("/notifications", get(notifications::get_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route(
            "/notifications/mark-all-read",
            post(notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/mark-read",
            post(notifications::mark_notification_read),
        )
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification),
        )
        .route("/projects/mine", get(projects::my_projects))
        .route(
            "/projects/create",
            post(projects::create_project).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/projects/{id}",
            put(projects::update_project).delete(projects::delete_project),
        )
        .route("/projects/{id}/upvote", post(projects::upvote))
        .route("/projects/{id}/comments", post(projects::create_comment))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
