//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, or 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: work-context snapshots.
///
/// The full snapshot is stored as a JSON payload; the indexed columns serve
/// per-developer scans and expiry sweeps.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id           TEXT PRIMARY KEY,
            developer_id TEXT NOT NULL,
            project_id   TEXT NOT NULL,
            captured_at  TEXT NOT NULL,
            expires_at   TEXT NOT NULL,
            payload      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_developer ON snapshots(developer_id);
        CREATE INDEX IF NOT EXISTS idx_snapshots_expires_at ON snapshots(expires_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: append-only context-switch log.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS switch_events (
            seq          INTEGER PRIMARY KEY AUTOINCREMENT,
            id           TEXT NOT NULL UNIQUE,
            developer_id TEXT NOT NULL,
            occurred_at  TEXT NOT NULL,
            payload      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_switch_events_developer_occurred_at
            ON switch_events(developer_id, occurred_at);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
