use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, messages, notifications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                full_name       TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash   TEXT,
                role            TEXT NOT NULL CHECK (role IN ('student', 'guest')),
                matric_number   TEXT UNIQUE,
                course          TEXT,
                organization    TEXT,
                position        TEXT,
                civic_id        TEXT UNIQUE,
                is_verified     INTEGER NOT NULL DEFAULT 0,
                points          INTEGER NOT NULL DEFAULT 0,
                last_login      TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                CHECK (password_hash IS NOT NULL OR civic_id IS NOT NULL)
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text            TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_pair
                ON messages(sender_id, receiver_id, created_at);
            CREATE INDEX idx_messages_unread
                ON messages(receiver_id, is_read);

            CREATE TABLE notifications (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind            TEXT NOT NULL,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user
                ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (projects)");
        conn.execute_batch(
            "
            CREATE TABLE projects (
                id              TEXT PRIMARY KEY,
                creator_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                tagline         TEXT NOT NULL DEFAULT '',
                problem         TEXT NOT NULL DEFAULT '',
                solution        TEXT NOT NULL DEFAULT '',
                target_market   TEXT NOT NULL DEFAULT '',
                category        TEXT NOT NULL,
                stage           TEXT NOT NULL,
                tags            TEXT NOT NULL DEFAULT '[]',
                demo_url        TEXT,
                is_published    INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_projects_published
                ON projects(is_published, created_at);
            CREATE INDEX idx_projects_creator
                ON projects(creator_id);

            CREATE TABLE project_assets (
                project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                kind            TEXT NOT NULL CHECK (kind IN ('logo', 'cover')),
                content_type    TEXT NOT NULL,
                data            BLOB NOT NULL,
                PRIMARY KEY (project_id, kind)
            );

            CREATE TABLE project_upvotes (
                project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                PRIMARY KEY (project_id, user_id)
            );

            CREATE TABLE project_comments (
                id              TEXT PRIMARY KEY,
                project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text            TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_project
                ON project_comments(project_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
