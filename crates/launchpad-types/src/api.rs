use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Notification, PublicUser, Role};

// -- JWT Claims --

/// Session token claims. Tokens are self-contained: there is no server-side
/// session row, so a token stays valid until `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Envelope --

/// Body of every successful response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// -- Auth --

/// Role-specific fields are optional at the wire level; which ones are
/// required depends on `role` and is checked by the auth service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub matric_number: Option<String>,
    pub course: Option<String>,
    pub organization: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or matric number.
    #[serde(alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CivicLoginRequest {
    pub assertion: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Either an explicit id list or a whole conversation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub message_ids: Option<Vec<Uuid>>,
    pub conversation_with: Option<Uuid>,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

// -- Projects --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub tagline: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub target_market: Option<String>,
    pub category: Option<String>,
    pub stage: Option<String>,
    pub tags: Option<Vec<String>>,
    /// An empty string clears the demo URL.
    pub demo_url: Option<String>,
    #[serde(alias = "publish")]
    pub is_published: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpvoteResponse {
    pub upvoted: bool,
    pub upvotes: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

// -- Small acknowledgements --

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}
