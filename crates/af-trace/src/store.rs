//! SQLite-backed event store.

use crate::TraceError;
use af_core::event::EventRecord;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, event_type, event_data, user_message FROM events";

/// Event store backed by a single SQLite database.
/// Uses Mutex<Connection> for thread safety (rusqlite::Connection is !Sync).
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open (or create) the event database at the given path.
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let conn = Connection::open(path).map_err(|e| TraceError::Database(e.to_string()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        tracing::debug!(path = %path.display(), "opened event store");
        Ok(store)
    }

    /// Create an in-memory event store (useful for testing).
    pub fn in_memory() -> Result<Self, TraceError> {
        let conn = Connection::open_in_memory().map_err(|e| TraceError::Database(e.to_string()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), TraceError> {
        let conn = self.conn.lock().map_err(|e| TraceError::Database(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                event_data TEXT NOT NULL,
                user_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_type
                ON events(event_type);",
        )
        .map_err(|e| TraceError::Database(e.to_string()))?;
        Ok(())
    }

    /// Append one event. Rows are never updated or deleted.
    pub fn append(&self, event: &EventRecord) -> Result<(), TraceError> {
        let conn = self.conn.lock().map_err(|e| TraceError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO events (id, timestamp, event_type, event_data, user_message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                event.id.to_string(),
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.event_data.to_string(),
                event.user_message,
            ],
        )
        .map_err(|e| TraceError::Database(e.to_string()))?;
        tracing::debug!(event_type = %event.event_type, "logged event");
        Ok(())
    }

    /// Most recent events first.
    pub fn recent(&self, limit: u32) -> Result<Vec<EventRecord>, TraceError> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY seq DESC LIMIT ?1"),
            rusqlite::params![limit],
        )
    }

    /// Most recent events of one type first.
    pub fn by_type(&self, event_type: &str, limit: u32) -> Result<Vec<EventRecord>, TraceError> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE event_type = ?1 ORDER BY seq DESC LIMIT ?2"),
            rusqlite::params![event_type, limit],
        )
    }

    pub fn count(&self) -> Result<u64, TraceError> {
        let conn = self.conn.lock().map_err(|e| TraceError::Database(e.to_string()))?;
        conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(|e| TraceError::Database(e.to_string()))
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<EventRecord>, TraceError> {
        let conn = self.conn.lock().map_err(|e| TraceError::Database(e.to_string()))?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| TraceError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, |row| {
                Ok(RawEventRow {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    event_type: row.get(2)?,
                    event_data: row.get(3)?,
                    user_message: row.get(4)?,
                })
            })
            .map_err(|e| TraceError::Database(e.to_string()))?;

        let mut events = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| TraceError::Database(e.to_string()))?;
            events.push(raw_to_event(raw)?);
        }
        Ok(events)
    }
}

/// Internal row struct for SQLite queries.
struct RawEventRow {
    id: String,
    timestamp: String,
    event_type: String,
    event_data: String,
    user_message: Option<String>,
}

fn raw_to_event(raw: RawEventRow) -> Result<EventRecord, TraceError> {
    let parse_err = |field: &str, e: String| TraceError::Database(format!("{field}: {e}"));

    Ok(EventRecord {
        id: raw
            .id
            .parse()
            .map_err(|e: uuid::Error| parse_err("id", e.to_string()))?,
        timestamp: chrono::DateTime::parse_from_rfc3339(&raw.timestamp)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| parse_err("timestamp", e.to_string()))?,
        event_type: raw.event_type,
        event_data: serde_json::from_str(&raw.event_data)
            .map_err(|e| parse_err("event_data", e.to_string()))?,
        user_message: raw.user_message,
    })
}
