//! Applying change events to the backup mirror

use std::sync::Arc;

use mirror_diff::{DiffEngine, DiffRecord};
use mirror_fs::{RobustnessConfig, io};
use tokio::task::spawn_blocking;

use crate::changelog::{ChangeLogSink, LogOperation};
use crate::config::RenamePolicy;
use crate::event::{ChangeEvent, Operation};
use crate::watch::WatchRegistry;
use crate::{Error, Result};

/// What applying one event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The mirror was updated; `logged` is false when nothing was recorded
    Applied { logged: bool },
    /// The source path vanished before it could be read
    SourceGone,
    /// The mirror already reflects the event
    Unchanged,
}

/// Keeps the backup tree in step with classified events.
#[derive(Clone)]
pub struct MirrorSync {
    sink: Arc<dyn ChangeLogSink>,
    registry: Option<Arc<WatchRegistry>>,
    diff: DiffEngine,
    io: RobustnessConfig,
    rename_policy: RenamePolicy,
}

impl std::fmt::Debug for MirrorSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSync")
            .field("registry", &self.registry)
            .field("io", &self.io)
            .field("rename_policy", &self.rename_policy)
            .finish_non_exhaustive()
    }
}

enum Prepared {
    Modify { diff: DiffRecord, content: Vec<u8> },
    Done(SyncOutcome),
}

impl MirrorSync {
    pub fn new(sink: Arc<dyn ChangeLogSink>) -> Self {
        Self {
            sink,
            registry: None,
            diff: DiffEngine::new(),
            io: RobustnessConfig::default(),
            rename_policy: RenamePolicy::default(),
        }
    }

    /// Register directories created in the source with `registry`.
    pub fn with_registry(mut self, registry: Arc<WatchRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_io(mut self, io: RobustnessConfig) -> Self {
        self.io = io;
        self
    }

    pub fn with_rename_policy(mut self, policy: RenamePolicy) -> Self {
        self.rename_policy = policy;
        self
    }

    pub fn sink(&self) -> &Arc<dyn ChangeLogSink> {
        &self.sink
    }

    /// Apply one event to the mirror and record it.
    ///
    /// Callers serialize events on overlapping backup paths; this method
    /// assumes no other task touches `event.backup` or anything beneath it
    /// meanwhile.
    pub async fn apply(&self, event: &ChangeEvent) -> Result<SyncOutcome> {
        match event.op {
            Operation::Create => self.create(event).await,
            Operation::Modify => self.modify(event).await,
            Operation::Remove => self.remove(event, true).await,
            Operation::RenameAway => {
                let log = self.rename_policy == RenamePolicy::LogAsRemove;
                self.remove(event, log).await
            }
        }
    }

    async fn create(&self, event: &ChangeEvent) -> Result<SyncOutcome> {
        let (target, backup) = (event.target.clone(), event.backup.clone());
        let (io_config, registry) = (self.io, self.registry.clone());

        let outcome = blocking(move || {
            if !io::path_exists(&target) {
                return Ok(SyncOutcome::SourceGone);
            }
            if io::path_exists(&backup) {
                return Ok(SyncOutcome::Unchanged);
            }
            if target.is_dir() {
                io::create_dir_all(&backup, io_config)?;
                if let Some(registry) = registry {
                    registry.add(&target)?;
                }
            } else {
                io::create_empty(&backup, io_config)?;
            }
            Ok(SyncOutcome::Applied { logged: true })
        })
        .await?;

        if outcome == (SyncOutcome::Applied { logged: true }) {
            self.sink
                .insert(event.target.as_str(), LogOperation::Create, None)
                .await?;
        }
        Ok(outcome)
    }

    async fn modify(&self, event: &ChangeEvent) -> Result<SyncOutcome> {
        let (target, backup) = (event.target.clone(), event.backup.clone());
        let (io_config, engine) = (self.io, self.diff);

        let prepared = blocking(move || {
            if target.is_dir() {
                return Ok(Prepared::Done(SyncOutcome::Unchanged));
            }
            let content = match io::read_bytes(&target, io_config) {
                Ok(content) => content,
                Err(e) if e.is_not_found() => return Ok(Prepared::Done(SyncOutcome::SourceGone)),
                Err(e) => return Err(e.into()),
            };
            let before = io::read_bytes_or_empty(&backup, io_config)?;
            let diff = engine.diff_bytes(&before, &content);
            Ok(Prepared::Modify { diff, content })
        })
        .await?;

        let (diff, content) = match prepared {
            Prepared::Modify { diff, content } => (diff, content),
            Prepared::Done(outcome) => return Ok(outcome),
        };

        self.sink
            .insert(event.target.as_str(), LogOperation::Modify, Some(&diff))
            .await?;

        let (backup, io_config) = (event.backup.clone(), self.io);
        blocking(move || Ok(io::write_atomic(&backup, &content, io_config)?)).await?;

        tracing::debug!(path = %event.target, spans = diff.len(), "synced modification");
        Ok(SyncOutcome::Applied { logged: true })
    }

    async fn remove(&self, event: &ChangeEvent, log: bool) -> Result<SyncOutcome> {
        let (target, backup) = (event.target.clone(), event.backup.clone());
        let (io_config, registry) = (self.io, self.registry.clone());

        let removed = blocking(move || {
            let removed = io::remove_path(&backup, io_config)?;
            if let Some(registry) = registry {
                registry.forget_under(&target);
            }
            Ok(removed)
        })
        .await?;

        // A rename already mirrored by an earlier notification removes nothing.
        let log = log && (removed || event.op == Operation::Remove);
        if log {
            self.sink
                .insert(event.target.as_str(), LogOperation::Remove, None)
                .await?;
        }
        Ok(SyncOutcome::Applied { logged: log })
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    spawn_blocking(f).await.map_err(Error::task)?
}

