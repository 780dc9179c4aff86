//! Database row types. These map directly to SQLite rows and stay distinct
//! from the launchpad-types API models so the storage layer can evolve
//! independently; the `From` impls below are the only bridge.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use launchpad_types::models::{
    AssetKind, Comment, Message, Notification, NotificationKind, Project, PublicUser, Role,
    UserSummary,
};

#[derive(Debug)]
pub struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub matric_number: Option<String>,
    pub course: Option<String>,
    pub organization: Option<String>,
    pub position: Option<String>,
    pub civic_id: Option<String>,
    pub is_verified: bool,
    pub points: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            full_name: self.full_name.clone(),
            role: self.role,
            is_verified: self.is_verified,
        }
    }
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        PublicUser {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            role: row.role,
            matric_number: row.matric_number,
            course: row.course,
            organization: row.organization,
            position: row.position,
            is_verified: row.is_verified,
            points: row.points,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert payload for a new user.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub full_name: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: Role,
    pub matric_number: Option<&'a str>,
    pub course: Option<&'a str>,
    pub organization: Option<&'a str>,
    pub position: Option<&'a str>,
    pub civic_id: Option<&'a str>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            text: row.text,
            is_read: row.is_read,
            created_at: row.created_at,
            client_id: None,
        }
    }
}

#[derive(Debug)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            kind: row.kind,
            title: row.title,
            description: row.description,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// The user-editable part of a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectFields {
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
}

/// A project with its derived aggregates.
#[derive(Debug)]
pub struct ProjectRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub fields: ProjectFields,
    pub has_logo: bool,
    pub has_cover: bool,
    pub upvotes: u64,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        let f = row.fields;
        Project {
            id: row.id,
            creator_id: row.creator_id,
            title: f.title,
            tagline: f.tagline,
            problem: f.problem,
            solution: f.solution,
            target_market: f.target_market,
            category: f.category,
            stage: f.stage,
            tags: f.tags,
            demo_url: f.demo_url,
            is_published: f.is_published,
            has_logo: row.has_logo,
            has_cover: row.has_cover,
            upvotes: row.upvotes,
            comments: row.comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
pub struct AssetRow {
    pub kind: AssetKind,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct CommentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            project_id: row.project_id,
            author: row.author,
            text: row.text,
            created_at: row.created_at,
        }
    }
}
