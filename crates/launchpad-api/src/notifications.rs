use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use launchpad_db::Database;
use launchpad_db::models::NotificationRow;
use launchpad_types::api::{
    CountResponse, DeletedResponse, Envelope, NotificationsResponse, UpdatedResponse,
};
use launchpad_types::models::{Notification, NotificationKind};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::{AppState, AppStateInner, blocking};

/// Record a notification for `user_id`. Failures are logged and swallowed:
/// the action that triggered it has already happened.
pub(crate) fn notify(
    db: &Database,
    user_id: Uuid,
    kind: NotificationKind,
    title: String,
    description: String,
    now: DateTime<Utc>,
) {
    let row = NotificationRow {
        id: Uuid::new_v4(),
        user_id,
        kind,
        title,
        description,
        is_read: false,
        created_at: now,
    };

    match db.insert_notification(&row) {
        Ok(()) => debug!("Notified {} ({})", user_id, kind.as_str()),
        Err(e) => warn!("Failed to store {} notification for {}: {:#}", kind.as_str(), user_id, e),
    }
}

pub fn list(state: &AppStateInner, user_id: Uuid) -> Result<NotificationsResponse, ApiError> {
    let notifications: Vec<Notification> = state
        .db
        .get_notifications(user_id)?
        .into_iter()
        .map(Notification::from)
        .collect();
    let unread_count = notifications.iter().filter(|n| !n.is_read).count() as u64;

    Ok(NotificationsResponse {
        notifications,
        unread_count,
    })
}

pub fn unread_count(state: &AppStateInner, user_id: Uuid) -> Result<u64, ApiError> {
    Ok(state.db.count_unread_notifications(user_id)?)
}

/// Someone else's notification reads as not found.
pub fn mark_read(state: &AppStateInner, user_id: Uuid, id: Uuid) -> Result<Notification, ApiError> {
    state.db.mark_notification_read(user_id, id)?;
    state
        .db
        .get_notification(user_id, id)?
        .map(Notification::from)
        .ok_or(ApiError::NotFound("Notification"))
}

pub fn mark_all(state: &AppStateInner, user_id: Uuid) -> Result<u64, ApiError> {
    Ok(state.db.mark_all_notifications_read(user_id)?)
}

pub fn delete(state: &AppStateInner, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    if state.db.delete_notification(user_id, id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Notification"))
    }
}

// -- Handlers --

pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = blocking(&state, move |s| list(s, user.id)).await?;
    Ok(Json(Envelope::ok(resp)))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let count = blocking(&state, move |s| unread_count(s, user.id)).await?;
    Ok(Json(Envelope::ok(CountResponse { count })))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = blocking(&state, move |s| mark_read(s, user.id, id)).await?;
    Ok(Json(Envelope::ok(notification)))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = blocking(&state, move |s| mark_all(s, user.id)).await?;
    Ok(Json(Envelope::ok(UpdatedResponse { updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| delete(s, user.id, id)).await?;
    Ok(Json(Envelope::ok(DeletedResponse { deleted: true })))
}
