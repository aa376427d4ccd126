//! Recursive directory traversal

use std::path::Path;

use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// One entry yielded by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: NormalizedPath,
    pub is_dir: bool,
}

/// Walk `root` recursively and return every file and directory below it.
///
/// The root itself is not included. Symlinks are followed; a link that
/// points back at one of its ancestors fails the scan instead of looping.
/// Any error aborts the whole walk since a partial listing cannot seed a
/// consistent mirror.
pub fn scan(root: impl AsRef<Path>) -> Result<Vec<ScanEntry>> {
    Ok(walk(root.as_ref(), 1)?
        .into_iter()
        .map(|(path, is_dir)| ScanEntry { path, is_dir })
        .collect())
}

/// Every directory under `root`, `root` included.
pub fn directories(root: impl AsRef<Path>) -> Result<Vec<NormalizedPath>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(walk(root, 0)?
        .into_iter()
        .filter_map(|(path, is_dir)| is_dir.then_some(path))
        .collect())
}

fn walk(root: &Path, min_depth: usize) -> Result<Vec<(NormalizedPath, bool)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(min_depth)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        entries.push((NormalizedPath::new(entry.path()), entry.file_type().is_dir()));
    }
    tracing::trace!(root = %root.display(), count = entries.len(), "scanned tree");
    Ok(entries)
}

fn walk_error(root: &Path, error: walkdir::Error) -> Error {
    let path = error.path().unwrap_or(root).to_path_buf();
    if let Some(ancestor) = error.loop_ancestor() {
        return Error::SymlinkLoop {
            ancestor: ancestor.to_path_buf(),
            path,
        };
    }
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
    Error::Io { path, source }
}
