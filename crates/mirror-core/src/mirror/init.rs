//! Bootstrap copy of the source tree into the backup root

use std::path::Path;

use mirror_fs::{NormalizedPath, RobustnessConfig, io, scan};
use serde::Serialize;

use crate::{Error, Result};

/// What the bootstrap copy produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

/// Resolved source and backup roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRoots {
    pub source: NormalizedPath,
    pub backup: NormalizedPath,
}

impl MirrorRoots {
    /// Canonicalize `source`, make `backup` absolute and refuse overlap.
    ///
    /// The backup root does not need to exist yet.
    pub fn resolve(source: impl AsRef<Path>, backup: impl AsRef<Path>) -> Result<Self> {
        let (source, backup) = (source.as_ref(), backup.as_ref());
        if !source.is_dir() {
            return Err(Error::SourceNotDirectory {
                path: source.to_path_buf(),
            });
        }
        let source = NormalizedPath::canonicalize(source)?;
        let backup = resolve_backup(backup)?;

        if backup.starts_with(&source) || source.starts_with(&backup) {
            return Err(Error::OverlappingRoots {
                source_root: source.to_native(),
                backup: backup.to_native(),
            });
        }
        Ok(Self { source, backup })
    }
}

/// Absolute backup root with symlinks resolved as far as it exists.
fn resolve_backup(backup: &Path) -> Result<NormalizedPath> {
    if backup.exists() {
        return Ok(NormalizedPath::canonicalize(backup)?);
    }
    let absolute = std::path::absolute(backup)?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.is_dir() => {
            Ok(NormalizedPath::canonicalize(parent)?.join(&name.to_string_lossy()))
        }
        _ => Ok(NormalizedPath::new(absolute)),
    }
}

/// Replace whatever is at the backup root with a copy of the source tree.
///
/// Any failure aborts the bootstrap; a half-built mirror is left behind
/// and rebuilt on the next start.
pub fn init_mirror(roots: &MirrorRoots, config: RobustnessConfig) -> Result<InitSummary> {
    let MirrorRoots { source, backup } = roots;

    if io::remove_path(backup, config)? {
        tracing::debug!(path = %backup, "removed previous mirror");
    }
    io::create_dir_all(backup, config)?;

    let mut summary = InitSummary::default();
    for entry in scan(source.to_native())? {
        let Some(target) = entry.path.rebase(source, backup) else {
            continue;
        };
        if entry.is_dir {
            io::create_dir_all(&target, config)?;
            summary.directories += 1;
        } else {
            summary.bytes += io::copy_file(&entry.path, &target, config)?;
            summary.files += 1;
        }
    }

    tracing::info!(
        source = %source,
        backup = %backup,
        directories = summary.directories,
        files = summary.files,
        bytes = summary.bytes,
        "mirror initialized"
    );
    Ok(summary)
}
