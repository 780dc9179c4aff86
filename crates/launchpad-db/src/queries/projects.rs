use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use launchpad_types::models::{AssetKind, UserSummary};

use super::{OptionalExt, get_parsed, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::{AssetRow, CommentRow, ProjectFields, ProjectRow};

/// Optional filters for the public project listing.
#[derive(Debug, Default, Clone)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub stage: Option<String>,
    pub creator_id: Option<Uuid>,
}

const PROJECT_SELECT: &str = "
    SELECT p.id, p.creator_id, p.title, p.tagline, p.problem, p.solution, p.target_market,
           p.category, p.stage, p.tags, p.demo_url, p.is_published, p.created_at, p.updated_at,
           EXISTS(SELECT 1 FROM project_assets a WHERE a.project_id = p.id AND a.kind = 'logo'),
           EXISTS(SELECT 1 FROM project_assets a WHERE a.project_id = p.id AND a.kind = 'cover'),
           (SELECT COUNT(*) FROM project_upvotes v WHERE v.project_id = p.id),
           (SELECT COUNT(*) FROM project_comments c WHERE c.project_id = p.id)
    FROM projects p";

impl Database {
    /// Insert a project and its assets in one transaction.
    pub fn insert_project(
        &self,
        id: Uuid,
        creator_id: Uuid,
        fields: &ProjectFields,
        assets: &[AssetRow],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let tags = serde_json::to_string(&fields.tags)?;
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO projects (id, creator_id, title, tagline, problem, solution, target_market,
                                       category, stage, tags, demo_url, is_published, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                params![
                    id.to_string(),
                    creator_id.to_string(),
                    fields.title,
                    fields.tagline,
                    fields.problem,
                    fields.solution,
                    fields.target_market,
                    fields.category,
                    fields.stage,
                    tags,
                    fields.demo_url,
                    fields.is_published,
                    ts(&now),
                ],
            )?;

            for asset in assets {
                tx.execute(
                    "INSERT OR REPLACE INTO project_assets (project_id, kind, content_type, data)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), asset.kind.as_str(), asset.content_type, asset.data],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1", PROJECT_SELECT);
            conn.query_row(&sql, [id.to_string()], map_project).optional()
        })
    }

    /// Published projects, newest first.
    pub fn list_published_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRow>> {
        let mut predicates = vec!["p.is_published = 1".to_string()];
        let mut values: Vec<String> = Vec::new();

        if let Some(category) = &filter.category {
            values.push(category.clone());
            predicates.push(format!("p.category = ?{} COLLATE NOCASE", values.len()));
        }
        if let Some(stage) = &filter.stage {
            values.push(stage.clone());
            predicates.push(format!("p.stage = ?{} COLLATE NOCASE", values.len()));
        }
        if let Some(creator_id) = filter.creator_id {
            values.push(creator_id.to_string());
            predicates.push(format!("p.creator_id = ?{}", values.len()));
        }

        self.with_conn(|conn| query_projects(conn, &predicates.join(" AND "), &values))
    }

    /// Every project the user created, drafts included.
    pub fn list_projects_by_creator(&self, creator_id: Uuid) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| query_projects(conn, "p.creator_id = ?1", &[creator_id.to_string()]))
    }

    pub fn update_project(&self, id: Uuid, fields: &ProjectFields, now: DateTime<Utc>) -> Result<bool> {
        let tags = serde_json::to_string(&fields.tags)?;
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE projects
                 SET title = ?1, tagline = ?2, problem = ?3, solution = ?4, target_market = ?5,
                     category = ?6, stage = ?7, tags = ?8, demo_url = ?9, is_published = ?10,
                     updated_at = ?11
                 WHERE id = ?12",
                params![
                    fields.title,
                    fields.tagline,
                    fields.problem,
                    fields.solution,
                    fields.target_market,
                    fields.category,
                    fields.stage,
                    tags,
                    fields.demo_url,
                    fields.is_published,
                    ts(&now),
                    id.to_string(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the project; assets, upvotes and comments cascade.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    /// Toggle an upvote: removes if exists, inserts if not.
    /// Returns true when the upvote was added.
    pub fn toggle_upvote(&self, project_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let removed = tx.execute(
                "DELETE FROM project_upvotes WHERE project_id = ?1 AND user_id = ?2",
                params![project_id.to_string(), user_id.to_string()],
            )?;

            let added = if removed == 0 {
                tx.execute(
                    "INSERT INTO project_upvotes (project_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    params![project_id.to_string(), user_id.to_string(), ts(&now)],
                )?;
                true
            } else {
                false
            };

            tx.commit()?;
            Ok(added)
        })
    }

    pub fn count_upvotes(&self, project_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM project_upvotes WHERE project_id = ?1",
                [project_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn get_project_asset(&self, project_id: Uuid, kind: AssetKind) -> Result<Option<AssetRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT kind, content_type, data FROM project_assets WHERE project_id = ?1 AND kind = ?2",
                params![project_id.to_string(), kind.as_str()],
                |row| {
                    Ok(AssetRow {
                        kind: get_parsed(row, 0)?,
                        content_type: row.get(1)?,
                        data: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn insert_comment(
        &self,
        id: Uuid,
        project_id: Uuid,
        author_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO project_comments (id, project_id, author_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), project_id.to_string(), author_id.to_string(), text, ts(&now)],
            )?;
            Ok(())
        })
    }

    /// Comments on a project with their authors, oldest first.
    pub fn get_comments(&self, project_id: Uuid) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.project_id, u.id, u.full_name, u.role, u.is_verified, c.text, c.created_at
                 FROM project_comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.project_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC",
            )?;
            let rows = stmt
                .query_map([project_id.to_string()], |row| {
                    Ok(CommentRow {
                        id: get_uuid(row, 0)?,
                        project_id: get_uuid(row, 1)?,
                        author: UserSummary {
                            id: get_uuid(row, 2)?,
                            full_name: row.get(3)?,
                            role: get_parsed(row, 4)?,
                            is_verified: row.get(5)?,
                        },
                        text: row.get(6)?,
                        created_at: get_ts(row, 7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_projects(conn: &Connection, predicate: &str, values: &[String]) -> Result<Vec<ProjectRow>> {
    let sql = format!(
        "{} WHERE {} ORDER BY p.created_at DESC, p.rowid DESC",
        PROJECT_SELECT, predicate
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), map_project)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to load projects")?;
    Ok(rows)
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    let raw_tags: String = row.get(9)?;
    let tags: Vec<String> = serde_json::from_str(&raw_tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ProjectRow {
        id: get_uuid(row, 0)?,
        creator_id: get_uuid(row, 1)?,
        fields: ProjectFields {
            title: row.get(2)?,
            tagline: row.get(3)?,
            problem: row.get(4)?,
            solution: row.get(5)?,
            target_market: row.get(6)?,
            category: row.get(7)?,
            stage: row.get(8)?,
            tags,
            demo_url: row.get(10)?,
            is_published: row.get(11)?,
        },
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
        has_logo: row.get(14)?,
        has_cover: row.get(15)?,
        upvotes: row.get::<_, i64>(16)? as u64,
        comments: row.get::<_, i64>(17)? as u64,
    })
}
