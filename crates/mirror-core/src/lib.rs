//! Change monitoring and mirrored-backup engine for dirmirror
//!
//! This crate keeps a backup tree in step with a watched source tree,
//! implementing:
//!
//! - **Bootstrap mirror**: full copy of the source into a fresh backup root
//! - **Event source**: per-directory filesystem watches feeding raw notifications
//! - **Classification**: raw notifications mapped to create, modify, remove
//!   and rename-away events, with every dropped notification named
//! - **Sync**: per-event mirror updates with character diffs recorded in a
//!   change log
//! - **Hooks**: configured commands run after every accepted change
//!
//! # Architecture
//!
//! ```text
//!                    dirmirror (CLI)
//!                          |
//!                     mirror-core
//!                          |
//!                +---------+---------+
//!                |                   |
//!            mirror-fs          mirror-diff
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mirror_core::{Monitor, MonitorOptions, SqliteChangeLog, WatchConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> mirror_core::Result<()> {
//!     let setting = WatchConfig::load("config.yml")?.settings.remove(0);
//!     let sink = Arc::new(SqliteChangeLog::open("dirmirror.db")?);
//!     let mut monitor =
//!         Monitor::bootstrap(&setting, sink, MonitorOptions::default(), CancellationToken::new())
//!             .await?;
//!     monitor.run().await;
//!     Ok(())
//! }
//! ```

pub mod changelog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod hooks;
pub mod mirror;
pub mod monitor;
pub mod stats;
pub mod watch;

pub use changelog::{ChangeLogSink, LogEntry, LogOperation, MemoryChangeLog, SqliteChangeLog};
pub use config::{DEFAULT_BACKUP_DIR, RenamePolicy, WatchConfig, WatchSetting};
pub use dispatch::{DispatchOptions, Dispatcher, PathLocks, PathTurn};
pub use error::{Error, Result};
pub use event::{ChangeEvent, Classified, Classifier, Operation, RawNotification, RawOp, SkipReason};
pub use hooks::{CommandHook, HookContext, HookResult};
pub use mirror::{InitSummary, MirrorRoots, MirrorSync, SyncOutcome, init_mirror};
pub use monitor::{Monitor, MonitorOptions};
pub use stats::{EventStats, StatsSnapshot};
pub use watch::{WatchBackend, WatchRegistry, notify_source, translate};
