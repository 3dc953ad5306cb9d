//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use reflex_core::error::ReflexError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ReflexError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ReflexError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ReflexError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: reactions");
    }

    Ok(())
}

/// Version 1: reactions keyed by (event, name). Steps are stored as JSON.
fn apply_v1(conn: &Connection) -> Result<(), ReflexError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reactions (
            event       TEXT NOT NULL,
            name        TEXT NOT NULL,
            script      TEXT NOT NULL DEFAULT '',
            steps       TEXT NOT NULL DEFAULT '{}',
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY (event, name)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_created
            ON reactions (event, created_at);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'reactions');
        ",
    )
    .map_err(|e| ReflexError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
