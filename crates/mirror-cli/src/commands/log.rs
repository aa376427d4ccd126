//! `log`: print recent change-log entries

use std::path::Path;

use colored::Colorize;
use mirror_core::{ChangeLogSink, LogEntry, LogOperation, SqliteChangeLog};

use crate::error::{CliError, Result};

pub async fn run_log(database: &Path, limit: usize, json: bool) -> Result<()> {
    if !database.exists() {
        return Err(CliError::user(format!(
            "no change log at {}",
            database.display()
        )));
    }
    let log = SqliteChangeLog::open(database)?;
    let entries = log.recent(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No changes recorded.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &LogEntry) -> String {
    let op = match entry.op {
        LogOperation::Create => entry.op.as_str().green(),
        LogOperation::Modify => entry.op.as_str().yellow(),
        LogOperation::Remove => entry.op.as_str().red(),
    };
    let churn = entry
        .diff
        .as_ref()
        .map(|diff| {
            let (inserted, deleted) = diff.churn();
            format!(" (+{} -{})", inserted, deleted)
        })
        .unwrap_or_default();
    format!(
        "{:>6}  {}  {:<6}  {}{}",
        entry.id,
        entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
        op,
        entry.path,
        churn
    )
}
