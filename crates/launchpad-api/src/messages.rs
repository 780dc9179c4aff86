use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use launchpad_db::models::MessageRow;
use launchpad_types::api::{
    CountResponse, Envelope, MarkReadRequest, SendMessageRequest, UpdatedResponse,
};
use launchpad_types::models::{Conversation, Message};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::state::{AppState, AppStateInner, blocking, current_time};

pub const MAX_MESSAGE_LEN: usize = 5000;
/// Ceiling on `messageIds` in one mark-as-read request.
pub const MAX_MARK_READ_IDS: usize = 1000;

/// What a mark-as-read request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkReadTarget {
    Messages(Vec<Uuid>),
    Conversation(Uuid),
}

impl TryFrom<MarkReadRequest> for MarkReadTarget {
    type Error = ApiError;

    fn try_from(req: MarkReadRequest) -> Result<Self, Self::Error> {
        match (req.message_ids, req.conversation_with) {
            (Some(ids), None) if ids.len() > MAX_MARK_READ_IDS => Err(ApiError::Validation(
                format!("Cannot mark more than {} messages at once", MAX_MARK_READ_IDS),
            )),
            (Some(ids), None) => Ok(Self::Messages(ids)),
            (None, Some(other)) => Ok(Self::Conversation(other)),
            (Some(_), Some(_)) => Err(ApiError::Validation(
                "Provide either messageIds or conversationWith, not both".into(),
            )),
            (None, None) => Err(ApiError::MissingRequiredField("messageIds")),
        }
    }
}

// -- Service --

pub fn send_message(
    state: &AppStateInner,
    sender_id: Uuid,
    req: SendMessageRequest,
    now: DateTime<Utc>,
) -> Result<Message, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyText);
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "Message text cannot exceed {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    if req.receiver_id == sender_id {
        return Err(ApiError::Validation("You cannot message yourself".into()));
    }
    if state.db.get_user_by_id(req.receiver_id)?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let row = MessageRow {
        id: Uuid::new_v4(),
        sender_id,
        receiver_id: req.receiver_id,
        text: text.to_string(),
        is_read: false,
        created_at: now,
    };
    state.db.insert_message(&row)?;
    debug!("Message {} from {} to {}", row.id, sender_id, row.receiver_id);

    let mut message = Message::from(row);
    message.client_id = req.client_id;
    Ok(message)
}

/// Every message between the two users, oldest first, read or not.
pub fn get_messages(
    state: &AppStateInner,
    user_id: Uuid,
    other_id: Uuid,
) -> Result<Vec<Message>, ApiError> {
    let rows = state.db.get_messages_between(user_id, other_id)?;
    Ok(rows.into_iter().map(Message::from).collect())
}

/// One entry per counterpart, most recently active first.
pub fn get_conversations(
    state: &AppStateInner,
    user_id: Uuid,
) -> Result<Vec<Conversation>, ApiError> {
    let rows = state.db.get_messages_involving(user_id)?;

    struct Acc {
        // position of the last message in the ascending row list
        last_seq: usize,
        last: MessageRow,
        unread: u64,
        total: u64,
    }

    let mut by_other: HashMap<Uuid, Acc> = HashMap::new();
    for (seq, row) in rows.into_iter().enumerate() {
        let other = if row.sender_id == user_id {
            row.receiver_id
        } else {
            row.sender_id
        };
        let unread = u64::from(row.receiver_id == user_id && !row.is_read);

        match by_other.get_mut(&other) {
            Some(acc) => {
                acc.total += 1;
                acc.unread += unread;
                acc.last_seq = seq;
                acc.last = row;
            }
            None => {
                by_other.insert(
                    other,
                    Acc {
                        last_seq: seq,
                        last: row,
                        unread,
                        total: 1,
                    },
                );
            }
        }
    }

    let other_ids: Vec<Uuid> = by_other.keys().copied().collect();
    let users: HashMap<Uuid, _> = state
        .db
        .get_users_by_ids(&other_ids)?
        .into_iter()
        .map(|u| (u.id, u.summary()))
        .collect();

    let mut entries: Vec<(usize, Conversation)> = by_other
        .into_iter()
        .filter_map(|(other, acc)| {
            let Some(user) = users.get(&other).cloned() else {
                warn!("Conversation counterpart {} no longer exists", other);
                return None;
            };
            Some((
                acc.last_seq,
                Conversation {
                    user,
                    last_message: acc.last.into(),
                    unread_count: acc.unread,
                    total_messages: acc.total,
                },
            ))
        })
        .collect();

    entries.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(entries.into_iter().map(|(_, c)| c).collect())
}

/// Only messages addressed to `receiver_id` are touched; returns how many
/// matched.
pub fn mark_as_read(
    state: &AppStateInner,
    receiver_id: Uuid,
    target: MarkReadTarget,
) -> Result<u64, ApiError> {
    let updated = match target {
        MarkReadTarget::Messages(ids) if ids.is_empty() => 0,
        MarkReadTarget::Messages(ids) => state.db.mark_messages_read(receiver_id, &ids)?,
        MarkReadTarget::Conversation(other) => state.db.mark_conversation_read(receiver_id, other)?,
    };
    Ok(updated)
}

pub fn unread_count(state: &AppStateInner, user_id: Uuid) -> Result<u64, ApiError> {
    Ok(state.db.count_unread_messages(user_id)?)
}

// -- Handlers --

pub async fn send(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let message = blocking(&state, move |s| send_message(s, user.id, req, now)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(message))))
}

pub async fn thread(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(other_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(&state, move |s| get_messages(s, user.id, other_id)).await?;
    Ok(Json(Envelope::ok(messages)))
}

pub async fn conversations(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = blocking(&state, move |s| get_conversations(s, user.id)).await?;
    Ok(Json(Envelope::ok(conversations)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<MarkReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = MarkReadTarget::try_from(req)?;
    let updated = blocking(&state, move |s| mark_as_read(s, user.id, target)).await?;
    Ok(Json(Envelope::ok(UpdatedResponse { updated })))
}

pub async fn unread(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let count = blocking(&state, move |s| unread_count(s, user.id)).await?;
    Ok(Json(Envelope::ok(CountResponse { count })))
}
