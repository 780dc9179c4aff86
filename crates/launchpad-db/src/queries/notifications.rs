use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

use super::{OptionalExt, get_parsed, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::NotificationRow;

impl Database {
    pub fn insert_notification(&self, n: &NotificationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, title, description, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    n.id.to_string(),
                    n.user_id.to_string(),
                    n.kind.as_str(),
                    n.title,
                    n.description,
                    n.is_read,
                    ts(&n.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// All notifications owned by the user, newest first.
    pub fn get_notifications(&self, user_id: Uuid) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, title, description, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when the notification does not exist or belongs to
    /// someone else. Marking an already-read notification still returns true.
    pub fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns the number of notifications that went from unread to read.
    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?;
            Ok(changed as u64)
        })
    }

    pub fn delete_notification(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_notification(&self, user_id: Uuid, id: Uuid) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, kind, title, description, is_read, created_at
                 FROM notifications WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
                map_notification,
            )
            .optional()
        })
    }

    pub fn count_unread_notifications(&self, user_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        kind: get_parsed(row, 2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        is_read: row.get(5)?,
        created_at: get_ts(row, 6)?,
    })
}
