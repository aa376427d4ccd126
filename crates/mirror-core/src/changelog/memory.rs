use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use mirror_diff::DiffRecord;

use super::{ChangeLogSink, LogEntry, LogOperation};
use crate::{Error, Result};

/// In-process change log, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryChangeLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChangeLogSink for MemoryChangeLog {
    async fn insert(&self, path: &str, op: LogOperation, diff: Option<&DiffRecord>) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::ChangeLog {
            message: "memory log lock poisoned".into(),
        })?;
        let id = entries.len() as i64 + 1;
        entries.push(LogEntry {
            id,
            path: path.to_string(),
            op,
            diff: diff.cloned(),
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let entries = self.entries.lock().map_err(|_| Error::ChangeLog {
            message: "memory log lock poisoned".into(),
        })?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
