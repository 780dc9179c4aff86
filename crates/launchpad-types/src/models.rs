use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "guest" => Ok(Self::Guest),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Everything about a user that is safe to hand to clients.
/// The credential hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub is_verified: bool,
    pub points: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display identity of another user (message counterpart, comment author).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub is_verified: bool,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Correlation id supplied by the sender, echoed back once on send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Derived view over all messages exchanged with one counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: UserSummary,
    pub last_message: Message,
    pub unread_count: u64,
    pub total_messages: u64,
}

// -- Notifications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProjectUpvote,
    ProjectComment,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectUpvote => "project_upvote",
            Self::ProjectComment => "project_comment",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_upvote" => Ok(Self::ProjectUpvote),
            "project_comment" => Ok(Self::ProjectComment),
            "system" => Ok(Self::System),
            other => Err(format!("unknown notification kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Projects --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub tagline: String,
    pub problem: String,
    pub solution: String,
    pub target_market: String,
    pub category: String,
    pub stage: String,
    pub tags: Vec<String>,
    pub demo_url: Option<String>,
    pub is_published: bool,
    pub has_logo: bool,
    pub has_cover: bool,
    pub upvotes: u64,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Logo,
    Cover,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Cover => "cover",
        }
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logo" => Ok(Self::Logo),
            "cover" => Ok(Self::Cover),
            other => Err(format!("unknown asset kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn notification_kind_serializes_as_type() {
        let n = Notification {
            id: Uuid::nil(),
            kind: NotificationKind::ProjectUpvote,
            title: "New upvote".into(),
            description: "Someone upvoted".into(),
            is_read: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "project_upvote");
        assert_eq!(value["isRead"], false);
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Student, Role::Guest] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(serde_json::to_value(role).unwrap(), json!(role.as_str()));
        }
        assert!("admin".parse::<Role>().is_err());
    }
}
