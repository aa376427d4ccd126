//! Mirror I/O operations with retry and atomic replacement
//!
//! Every operation retries transient failures (interrupted calls, busy
//! resources, timeouts) with exponential backoff bounded by
//! [`RobustnessConfig::retry_budget`]. Permanent failures surface
//! immediately as [`Error::Io`] carrying the failing path.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Tuning for mirror I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// Total time spent retrying one operation before giving up.
    pub retry_budget: Duration,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Flush file contents to disk before renaming into place.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            retry_budget: Duration::from_secs(2),
            initial_interval: Duration::from_millis(25),
            enable_fsync: true,
        }
    }
}

/// Whether an I/O error is worth retrying.
pub fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::ResourceBusy
    )
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out.
pub fn retrying<T>(
    config: RobustnessConfig,
    path: &Path,
    mut op: impl FnMut() -> std::io::Result<T>,
) -> Result<T> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_interval)
        .with_max_elapsed_time(Some(config.retry_budget))
        .build();

    backoff::retry(policy, || {
        op().map_err(|e| {
            if is_transient(&e) {
                tracing::debug!(path = %path.display(), error = %e, "retrying transient I/O error");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(source) | backoff::Error::Transient { err: source, .. } => {
            Error::io(path, source)
        }
    })
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a reader of the mirror never sees a
/// half-written file. Acquires an advisory lock on the temp file.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        retrying(config, parent, || fs::create_dir_all(parent))?;
    }

    // Same directory as the target keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = retrying(config, &temp_path, || {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
    })?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| if config.enable_fsync { temp_file.sync_all() } else { Ok(()) });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;
    drop(temp_file);

    retrying(config, &native_path, || fs::rename(&temp_path, &native_path))
}

/// Read a whole file as bytes.
pub fn read_bytes(path: &NormalizedPath, config: RobustnessConfig) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    retrying(config, &native_path, || fs::read(&native_path))
}

/// Read a file as bytes, treating a missing file as empty.
pub fn read_bytes_or_empty(path: &NormalizedPath, config: RobustnessConfig) -> Result<Vec<u8>> {
    match read_bytes(path, config) {
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Byte-copy `src` to `dst`, returning the number of bytes copied.
pub fn copy_file(src: &NormalizedPath, dst: &NormalizedPath, config: RobustnessConfig) -> Result<u64> {
    let (src, dst) = (src.to_native(), dst.to_native());
    retrying(config, &dst, || fs::copy(&src, &dst))
}

/// Create (or truncate) an empty file and flush it, creating missing parents.
pub fn create_empty(path: &NormalizedPath, config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    if let Some(parent) = native_path.parent() {
        retrying(config, parent, || fs::create_dir_all(parent))?;
    }
    retrying(config, &native_path, || {
        let file = File::create(&native_path)?;
        if config.enable_fsync {
            file.sync_all()?;
        }
        Ok(())
    })
}

/// Create a directory and any missing parents.
pub fn create_dir_all(path: &NormalizedPath, config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    retrying(config, &native_path, || fs::create_dir_all(&native_path))
}

/// Remove a file, symlink or whole directory tree.
///
/// Returns `Ok(false)` when nothing existed at `path`.
pub fn remove_path(path: &NormalizedPath, config: RobustnessConfig) -> Result<bool> {
    let native_path = path.to_native();
    retrying(config, &native_path, || {
        let metadata = match fs::symlink_metadata(&native_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&native_path)
        } else {
            fs::remove_file(&native_path)
        };
        match removed {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    })
}

/// Existence check that only answers `false` when the path is known to be absent.
///
/// Any error other than "not found" (permission denied, for instance)
/// counts as existing, so callers never act on a guess that a path is gone.
pub fn path_exists(path: &NormalizedPath) -> bool {
    match fs::metadata(path.to_native()) {
        Ok(_) => true,
        Err(e) => e.kind() != ErrorKind::NotFound,
    }
}
