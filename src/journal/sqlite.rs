use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::journal::{coords_summary, CounterEvent, EventJournal, FrameRecord, TemperatureSample};

const DB_FILE_NAME: &str = "session.db";

/// Session-scoped SQLite journal.
///
/// Each daemon run gets its own timestamped directory under the configured
/// logs path, holding one database with the primary record table, the
/// reduced-column legacy record table, the append-only event list, and the
/// temperature samples. A single `session` meta row carries the startup
/// summary and the running unique total.
pub struct SqliteJournal {
    conn: Connection,
    session_dir: PathBuf,
}

impl SqliteJournal {
    /// Create the session directory under `logs_path` and open its database.
    pub fn create_session(logs_path: &Path, started_at: f64) -> Result<Self> {
        std::fs::create_dir_all(logs_path).map_err(|e| {
            anyhow!("failed to create logs path {}: {}", logs_path.display(), e)
        })?;
        let session_dir = logs_path.join(format!("session_{}", session_stamp()));
        std::fs::create_dir_all(&session_dir).map_err(|e| {
            anyhow!(
                "failed to create session dir {}: {}",
                session_dir.display(),
                e
            )
        })?;

        let conn = Connection::open(session_dir.join(DB_FILE_NAME))?;
        let mut journal = Self { conn, session_dir };
        journal.ensure_schema()?;
        journal.init_session_row(started_at)?;
        Ok(journal)
    }

    /// Open a journal in an existing directory. Used by tests.
    pub fn open_in(session_dir: &Path, started_at: f64) -> Result<Self> {
        let conn = Connection::open(session_dir.join(DB_FILE_NAME))?;
        let mut journal = Self {
            conn,
            session_dir: session_dir.to_path_buf(),
        };
        journal.ensure_schema()?;
        journal.init_session_row(started_at)?;
        Ok(journal)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS session (
              id INTEGER PRIMARY KEY CHECK (id = 1),
              started_at REAL NOT NULL,
              system_summary TEXT,
              total_unique INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS records (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              timestamp REAL NOT NULL,
              frame_count INTEGER NOT NULL,
              active_count INTEGER NOT NULL,
              total_unique INTEGER NOT NULL,
              total_visits INTEGER NOT NULL,
              detections_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS records_legacy (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              timestamp REAL NOT NULL,
              frame_count INTEGER NOT NULL,
              total_unique INTEGER NOT NULL,
              coordinates TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              kind TEXT NOT NULL,
              counter_value INTEGER NOT NULL,
              timestamp REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS temperature (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              timestamp REAL NOT NULL,
              celsius REAL NOT NULL,
              fps REAL
            );

            CREATE INDEX IF NOT EXISTS idx_records_timestamp ON records(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            "#,
        )?;
        Ok(())
    }

    fn init_session_row(&mut self, started_at: f64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO session(id, started_at) VALUES (1, ?1)",
            params![started_at],
        )?;
        Ok(())
    }

    /// One-time startup summary (model, tuning, output mode) carried in the
    /// session meta row.
    pub fn record_system_summary(&mut self, summary: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE session SET system_summary = ?1 WHERE id = 1",
            params![summary],
        )?;
        Ok(())
    }

    pub fn record_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn event_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl EventJournal for SqliteJournal {
    fn write_record(&mut self, record: &FrameRecord) -> Result<()> {
        let detections_json = serde_json::to_string(&record.detections)?;
        self.conn.execute(
            r#"
            INSERT INTO records(timestamp, frame_count, active_count, total_unique, total_visits, detections_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.timestamp,
                record.frame_count as i64,
                record.active_count as i64,
                record.total_unique as i64,
                record.total_visits as i64,
                detections_json
            ],
        )?;

        // The session header tracks the latest unique total.
        self.conn.execute(
            "UPDATE session SET total_unique = ?1 WHERE id = 1",
            params![record.total_unique as i64],
        )?;

        // Legacy table only carries frames that actually had detections.
        if !record.detections.is_empty() {
            self.conn.execute(
                r#"
                INSERT INTO records_legacy(timestamp, frame_count, total_unique, coordinates)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    record.timestamp,
                    record.frame_count as i64,
                    record.total_unique as i64,
                    coords_summary(&record.detections)
                ],
            )?;
        }
        Ok(())
    }

    fn write_event(&mut self, event: &CounterEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events(kind, counter_value, timestamp) VALUES (?1, ?2, ?3)",
            params![
                event.kind.as_str(),
                event.counter_value as i64,
                event.timestamp
            ],
        )?;
        Ok(())
    }

    fn write_temperature(&mut self, sample: &TemperatureSample) -> Result<()> {
        self.conn.execute(
            "INSERT INTO temperature(timestamp, celsius, fps) VALUES (?1, ?2, ?3)",
            params![sample.timestamp, sample.celsius, sample.fps],
        )?;
        Ok(())
    }
}

fn session_stamp() -> String {
    // Seconds-resolution unique-enough name for a session directory; the
    // daemon creates exactly one per process.
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}", now)
}
