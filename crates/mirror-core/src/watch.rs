//! Change notifications from the filesystem
//!
//! Directories are watched one by one, non-recursively, so the set of
//! watched directories is explicit and lives in a [`WatchRegistry`].
//! Backend events are translated into [`RawNotification`]s and delivered
//! on an unbounded channel; dropping the registry closes the channel.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use mirror_fs::{NormalizedPath, io};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::event::{RawNotification, RawOp};
use crate::{Error, Result};

/// The part of a notification backend the registry drives.
pub trait WatchBackend: Send {
    fn watch(&mut self, path: &Path) -> notify::Result<()>;
    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;
}

impl WatchBackend for RecommendedWatcher {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        Watcher::watch(self, path, RecursiveMode::NonRecursive)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        Watcher::unwatch(self, path)
    }
}

struct RegistryState {
    backend: Box<dyn WatchBackend>,
    watched: BTreeSet<NormalizedPath>,
}

/// Set of watched directories, shared by bootstrap and the sync tasks.
pub struct WatchRegistry {
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watched", &self.len())
            .finish()
    }
}

impl WatchRegistry {
    pub fn new(backend: impl WatchBackend + 'static) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                backend: Box::new(backend),
                watched: BTreeSet::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // The state stays consistent across a panic in a backend call.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start watching `dir`. Returns `false` if it was already watched.
    pub fn add(&self, dir: &NormalizedPath) -> Result<bool> {
        let mut state = self.lock();
        if state.watched.contains(dir) {
            return Ok(false);
        }
        state
            .backend
            .watch(&dir.to_native())
            .map_err(|e| Error::WatchFailed {
                path: dir.to_native(),
                message: e.to_string(),
            })?;
        state.watched.insert(dir.clone());
        tracing::debug!(path = %dir, "watching directory");
        Ok(true)
    }

    /// Watch every directory in `dirs`, stopping at the first failure.
    pub fn add_all<'a>(&self, dirs: impl IntoIterator<Item = &'a NormalizedPath>) -> Result<usize> {
        let mut added = 0;
        for dir in dirs {
            if self.add(dir)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Drop `path` and everything beneath it from the registry.
    ///
    /// Returns how many directories were forgotten.
    pub fn forget_under(&self, path: &NormalizedPath) -> usize {
        let mut state = self.lock();
        let gone: Vec<NormalizedPath> = state
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();
        for dir in &gone {
            state.watched.remove(dir);
            // The backend usually dropped the watch with the directory.
            if let Err(e) = state.backend.unwatch(&dir.to_native()) {
                tracing::trace!(path = %dir, error = %e, "unwatch failed");
            }
        }
        gone.len()
    }

    pub fn contains(&self, dir: &NormalizedPath) -> bool {
        self.lock().watched.contains(dir)
    }

    pub fn len(&self) -> usize {
        self.lock().watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the watched directories, sorted.
    pub fn watched(&self) -> Vec<NormalizedPath> {
        self.lock().watched.iter().cloned().collect()
    }
}

/// Translate a backend event into raw notifications.
pub fn translate(event: &Event) -> Vec<RawNotification> {
    let op = match event.kind {
        EventKind::Create(_) => RawOp::CREATE,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => RawOp::WRITE,
        EventKind::Modify(ModifyKind::Metadata(_)) => RawOp::CHMOD,
        EventKind::Modify(ModifyKind::Name(mode)) => return translate_rename(mode, &event.paths),
        EventKind::Remove(_) => RawOp::REMOVE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| RawNotification::new(path.clone(), op))
        .collect()
}

fn translate_rename(mode: RenameMode, paths: &[std::path::PathBuf]) -> Vec<RawNotification> {
    match mode {
        RenameMode::From => paths
            .iter()
            .map(|p| RawNotification::new(p.clone(), RawOp::RENAME))
            .collect(),
        RenameMode::To => paths
            .iter()
            .map(|p| RawNotification::new(p.clone(), RawOp::CREATE))
            .collect(),
        RenameMode::Both => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.first() {
                out.push(RawNotification::new(from.clone(), RawOp::RENAME));
            }
            if let Some(to) = paths.get(1) {
                out.push(RawNotification::new(to.clone(), RawOp::CREATE));
            }
            out
        }
        RenameMode::Any | RenameMode::Other => paths
            .iter()
            .map(|p| {
                let op = if io::path_exists(&NormalizedPath::new(p)) {
                    RawOp::CREATE
                } else {
                    RawOp::RENAME
                };
                RawNotification::new(p.clone(), op)
            })
            .collect(),
    }
}

/// Create the platform watcher and the channel it feeds.
///
/// Backend errors are logged and never close the channel.
pub fn notify_source() -> Result<(WatchRegistry, mpsc::UnboundedReceiver<RawNotification>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for raw in translate(&event) {
                if tx.send(raw).is_err() {
                    return;
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, paths = ?e.paths, "watch backend error"),
    })
    .map_err(|e| Error::WatchFailed {
        path: Default::default(),
        message: e.to_string(),
    })?;
    Ok((WatchRegistry::new(watcher), rx))
}
