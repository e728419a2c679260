use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, capsules)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE capsules (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                open_at     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                is_opened   INTEGER NOT NULL DEFAULT 0,
                opened_at   TEXT,
                CHECK ((is_opened = 0 AND opened_at IS NULL)
                    OR (is_opened = 1 AND opened_at IS NOT NULL))
            );

            CREATE INDEX idx_capsules_owner
                ON capsules(user_id, created_at);

            CREATE INDEX idx_capsules_created
                ON capsules(created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
