use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            rate INTEGER NOT NULL CHECK (rate BETWEEN 1 AND 5),
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS locations_created_idx ON locations(created_at);
        CREATE INDEX IF NOT EXISTS locations_rate_idx ON locations(rate);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
