use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // todo_tags deliberately carries no foreign keys: parents are removed
        // by the relationship protocol, not by the store.
        conn.execute_batch(
            "
            CREATE TABLE todos (
                id          TEXT PRIMARY KEY,
                content     TEXT NOT NULL,
                is_done     INTEGER NOT NULL DEFAULT 0,
                owner       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_todos_owner ON todos(owner, created_at);

            CREATE TABLE tags (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE todo_tags (
                id          TEXT PRIMARY KEY,
                todo_id     TEXT NOT NULL,
                tag_id      TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_todo_tags_todo ON todo_tags(todo_id);
            CREATE INDEX idx_todo_tags_tag ON todo_tags(tag_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
