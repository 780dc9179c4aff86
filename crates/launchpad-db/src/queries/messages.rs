use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use super::{get_ts, get_uuid, placeholders, ts};
use crate::Database;
use crate::models::MessageRow;

/// Ids bound per statement, well under SQLite's host parameter limit.
const MARK_READ_CHUNK: usize = 500;

impl Database {
    pub fn insert_message(&self, msg: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, text, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id.to_string(),
                    msg.sender_id.to_string(),
                    msg.receiver_id.to_string(),
                    msg.text,
                    msg.is_read,
                    ts(&msg.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Full history between two users, oldest first.
    pub fn get_messages_between(&self, user_id: Uuid, other_id: Uuid) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "(sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)",
                &[&user_id.to_string(), &other_id.to_string()],
            )
        })
    }

    /// Every message the user sent or received, oldest first.
    pub fn get_messages_involving(&self, user_id: Uuid) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "sender_id = ?1 OR receiver_id = ?1",
                &[&user_id.to_string()],
            )
        })
    }

    /// Mark the given messages read, but only those addressed to `receiver_id`.
    /// Returns how many of the ids matched that condition.
    pub fn mark_messages_read(&self, receiver_id: Uuid, message_ids: &[Uuid]) -> Result<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut changed = 0;
            for chunk in message_ids.chunks(MARK_READ_CHUNK) {
                let sql = format!(
                    "UPDATE messages SET is_read = 1 WHERE receiver_id = ?1 AND id IN ({})",
                    placeholders(1, chunk.len())
                );
                let mut values: Vec<String> = Vec::with_capacity(chunk.len() + 1);
                values.push(receiver_id.to_string());
                values.extend(chunk.iter().map(Uuid::to_string));

                changed += tx.execute(&sql, rusqlite::params_from_iter(values.iter()))? as u64;
            }
            tx.commit()?;
            Ok(changed)
        })
    }

    /// Mark everything `other_id` sent to `receiver_id` as read.
    pub fn mark_conversation_read(&self, receiver_id: Uuid, other_id: Uuid) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1 WHERE receiver_id = ?1 AND sender_id = ?2",
                params![receiver_id.to_string(), other_id.to_string()],
            )?;
            Ok(changed as u64)
        })
    }

    pub fn count_unread_messages(&self, receiver_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0",
                [receiver_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn query_messages(
    conn: &Connection,
    predicate: &str,
    values: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<MessageRow>> {
    // rowid breaks ties between messages stored in the same microsecond
    let sql = format!(
        "SELECT id, sender_id, receiver_id, text, is_read, created_at
         FROM messages
         WHERE {}
         ORDER BY created_at ASC, rowid ASC",
        predicate
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values, map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: get_uuid(row, 0)?,
        sender_id: get_uuid(row, 1)?,
        receiver_id: get_uuid(row, 2)?,
        text: row.get(3)?,
        is_read: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}
