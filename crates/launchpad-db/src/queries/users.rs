use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use super::{OptionalExt, get_opt_ts, get_parsed, get_ts, get_uuid, placeholders, ts};
use crate::Database;
use crate::models::{NewUser, UserRow};

const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, matric_number, course, \
     organization, position, civic_id, is_verified, points, last_login, created_at, updated_at";

impl Database {
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        let created_at = ts(&user.created_at);
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, full_name, email, password_hash, role, matric_number, course,
                                    organization, position, civic_id, is_verified, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    user.id.to_string(),
                    user.full_name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.matric_number,
                    user.course,
                    user.organization,
                    user.position,
                    user.civic_id,
                    user.is_verified,
                    created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id.to_string()))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_civic_id(&self, civic_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "civic_id = ?1", civic_id))
    }

    /// Login lookup: the identifier may be an email or a matric number.
    pub fn get_user_by_login_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "email = ?1 OR matric_number = ?1", identifier)
        })
    }

    pub fn matric_number_exists(&self, matric_number: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE matric_number = ?1)",
                [matric_number],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Batch-fetch users for a set of ids. Unknown ids are skipped.
    pub fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE id IN ({})",
                USER_COLUMNS,
                placeholders(0, ids.len())
            );
            let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(id_strings.iter()), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Attach an identity-provider subject to an existing account. The
    /// provider has vouched for the email, so the account becomes verified.
    /// Returns false when the account is already linked to another subject.
    pub fn link_civic_id(&self, user_id: Uuid, civic_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET civic_id = ?1, is_verified = 1, updated_at = ?2
                 WHERE id = ?3 AND (civic_id IS NULL OR civic_id = ?1)",
                params![civic_id, ts(&now), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn touch_last_login(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                params![ts(&now), user_id.to_string()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: get_uuid(row, 0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: get_parsed(row, 4)?,
        matric_number: row.get(5)?,
        course: row.get(6)?,
        organization: row.get(7)?,
        position: row.get(8)?,
        civic_id: row.get(9)?,
        is_verified: row.get(10)?,
        points: row.get(11)?,
        last_login: get_opt_ts(row, 12)?,
        created_at: get_ts(row, 13)?,
        updated_at: get_ts(row, 14)?,
    })
}
