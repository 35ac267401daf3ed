//! SQLite persistence for snapshots and switch events.
//!
//! Provides durable storage for:
//! - Work-context snapshots (JSON payload plus indexed id/developer/expiry columns)
//! - The append-only context-switch log

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::context::WorkContext;
use crate::error::{CoreError, StoreError};
use crate::store::SnapshotBackend;
use crate::switch::{ContextSwitchEvent, SwitchLog, TimeWindow};

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "refocus.db";

/// Fixed-width UTC timestamps so text comparison matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, payload: &str) -> Result<T, StoreError> {
    serde_json::from_str(payload).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn encode<T: serde::Serialize>(id: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    })
}

/// SQLite database backing the snapshot store and the switch log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/refocus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        Self::open_at(data_dir()?.join(DATABASE_FILE))
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, CoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored snapshots, expired ones included.
    pub fn snapshot_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn query_snapshots(&self, sql: &str, param: &str) -> Result<Vec<WorkContext>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![param], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut contexts = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            contexts.push(decode(&id, &payload)?);
        }
        Ok(contexts)
    }
}

impl SnapshotBackend for Database {
    fn put(&self, context: &WorkContext) -> Result<(), StoreError> {
        let payload = encode(context.id(), context)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO snapshots
                (id, developer_id, project_id, captured_at, expires_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                context.id(),
                context.developer_id(),
                context.project_id(),
                timestamp(context.captured_at()),
                timestamp(context.expires_at()),
                payload,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<WorkContext>, StoreError> {
        let payload = self
            .conn
            .lock()
            .query_row(
                "SELECT payload FROM snapshots WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        payload.map(|p| decode(id, &p)).transpose()
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn scan_developer(&self, developer_id: &str) -> Result<Vec<WorkContext>, StoreError> {
        self.query_snapshots(
            "SELECT id, payload FROM snapshots WHERE developer_id = ?1",
            developer_id,
        )
    }

    fn developers(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT developer_id FROM snapshots ORDER BY developer_id")?;
        let developers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(developers)
    }
}

impl SwitchLog for Database {
    /// Re-appending an event id that is already logged is a no-op.
    fn append(&self, event: &ContextSwitchEvent) -> Result<(), StoreError> {
        let payload = encode(event.id(), event)?;
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO switch_events (id, developer_id, occurred_at, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.id(),
                event.developer_id(),
                timestamp(event.occurred_at()),
                payload,
            ],
        )?;
        Ok(())
    }

    fn events(&self, developer_id: &str, window: &TimeWindow) -> Result<Vec<ContextSwitchEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, payload FROM switch_events
             WHERE developer_id = ?1 AND occurred_at >= ?2 AND occurred_at < ?3
             ORDER BY occurred_at, seq",
        )?;
        let rows = stmt.query_map(
            params![developer_id, timestamp(window.start), timestamp(window.end)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut events = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            events.push(decode(&id, &payload)?);
        }
        Ok(events)
    }
}
