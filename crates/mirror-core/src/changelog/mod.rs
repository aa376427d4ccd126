//! Change log persistence
//!
//! Every accepted change is recorded as a [`LogEntry`]: the source path,
//! the operation and, for modifications, the [`DiffRecord`] of inserted
//! and deleted text. Storage is reached only through [`ChangeLogSink`];
//! [`SqliteChangeLog`] is the durable implementation and
//! [`MemoryChangeLog`] keeps entries in process.

mod memory;
mod sqlite;

pub use memory::MemoryChangeLog;
pub use sqlite::SqliteChangeLog;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_diff::DiffRecord;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Operation tag stored with each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOperation {
    Create,
    Modify,
    Remove,
}

impl LogOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "modify" => Some(Self::Modify),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for LogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub path: String,
    pub op: LogOperation,
    /// Present for modifications only
    pub diff: Option<DiffRecord>,
    pub recorded_at: DateTime<Utc>,
}

/// Durable destination for change records.
///
/// Implementations must tolerate concurrent callers.
#[async_trait]
pub trait ChangeLogSink: Send + Sync {
    /// Append one entry.
    async fn insert(&self, path: &str, op: LogOperation, diff: Option<&DiffRecord>) -> Result<()>;

    /// The newest `limit` entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>>;
}
