use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_diff::DiffRecord;
use rusqlite::Connection;
use tokio::task::spawn_blocking;

use super::{ChangeLogSink, LogEntry, LogOperation};
use crate::{Error, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS log_table (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    op TEXT NOT NULL,
    data TEXT,
    recorded_at TEXT NOT NULL
)";

/// Change log stored in a SQLite database.
///
/// The `log_table` table is created on open if absent. Diffs are stored
/// as JSON text in the `data` column (`NULL` for creates and removes).
#[derive(Debug, Clone)]
pub struct SqliteChangeLog {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteChangeLog {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// A private database that lives as long as this handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "change log ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Database file, `None` for in-memory logs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| Error::ChangeLog {
                message: "connection lock poisoned".into(),
            })?;
            f(&conn)
        })
        .await
        .map_err(Error::task)?
    }
}

#[async_trait]
impl ChangeLogSink for SqliteChangeLog {
    async fn insert(&self, path: &str, op: LogOperation, diff: Option<&DiffRecord>) -> Result<()> {
        let data = diff.map(serde_json::to_string).transpose()?;
        let path = path.to_string();
        let recorded_at = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO log_table (path, op, data, recorded_at) VALUES (?1, ?2, ?3, ?4)",
                (&path, op.as_str(), &data, &recorded_at),
            )?;
            Ok(())
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, path, op, data, recorded_at FROM log_table ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut entries = Vec::new();
            for row in rows {
                let (id, path, op, data, recorded_at) = row?;
                entries.push(decode_entry(id, path, &op, data, &recorded_at)?);
            }
            Ok(entries)
        })
        .await
    }
}

fn decode_entry(
    id: i64,
    path: String,
    op: &str,
    data: Option<String>,
    recorded_at: &str,
) -> Result<LogEntry> {
    let op = LogOperation::parse(op).ok_or_else(|| Error::ChangeLog {
        message: format!("unknown operation `{}` in entry {}", op, id),
    })?;
    let diff = data.as_deref().map(serde_json::from_str).transpose()?;
    let recorded_at = DateTime::parse_from_rfc3339(recorded_at)
        .map_err(|e| Error::ChangeLog {
            message: format!("bad timestamp in entry {}: {}", id, e),
        })?
        .with_timezone(&Utc);

    Ok(LogEntry {
        id,
        path,
        op,
        diff,
        recorded_at,
    })
}
