use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use launchpad_types::api::Envelope;
use launchpad_types::models::PublicUser;

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner, blocking};

pub fn get_user(state: &AppStateInner, id: Uuid) -> Result<PublicUser, ApiError> {
    state
        .db
        .get_user_by_id(id)?
        .map(PublicUser::from)
        .ok_or(ApiError::UserNotFound)
}

/// GET /users/{id}, used to show a conversation partner before any
/// message has been exchanged.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |s| get_user(s, id)).await?;
    Ok(Json(Envelope::ok(user)))
}
