//! SHA-256 checksums and mirror verification
//!
//! Checksums use a single canonical format (`sha256:<hex>`). The mirror
//! check walks both trees and reports every relative path whose kind or
//! content differs.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, NormalizedPath, Result, scan};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of in-memory content.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(compute_content_checksum(&content))
}

/// A difference between a source tree and its mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorMismatch {
    /// Present in the source, absent from the mirror.
    Missing(String),
    /// Present in the mirror only.
    Extra(String),
    /// File in one tree, directory in the other.
    KindDiffers(String),
    /// Both are files with different bytes.
    ContentDiffers(String),
}

impl MirrorMismatch {
    pub fn relative_path(&self) -> &str {
        match self {
            Self::Missing(p) | Self::Extra(p) | Self::KindDiffers(p) | Self::ContentDiffers(p) => p,
        }
    }
}

/// Compare `source` against `backup` byte for byte.
///
/// An empty result means the mirror is consistent.
pub fn verify_mirror(source: impl AsRef<Path>, backup: impl AsRef<Path>) -> Result<Vec<MirrorMismatch>> {
    let source_entries = index(source.as_ref())?;
    let backup_entries = index(backup.as_ref())?;
    let mut mismatches = Vec::new();

    for (relative, (src_path, src_is_dir)) in &source_entries {
        match backup_entries.get(relative) {
            None => mismatches.push(MirrorMismatch::Missing(relative.clone())),
            Some((_, dst_is_dir)) if dst_is_dir != src_is_dir => {
                mismatches.push(MirrorMismatch::KindDiffers(relative.clone()));
            }
            Some((dst_path, false)) => {
                if compute_file_checksum(src_path.as_ref())? != compute_file_checksum(dst_path.as_ref())? {
                    mismatches.push(MirrorMismatch::ContentDiffers(relative.clone()));
                }
            }
            Some(_) => {}
        }
    }

    mismatches.extend(
        backup_entries
            .keys()
            .filter(|relative| !source_entries.contains_key(*relative))
            .map(|relative| MirrorMismatch::Extra(relative.clone())),
    );

    Ok(mismatches)
}

fn index(root: &Path) -> Result<BTreeMap<String, (NormalizedPath, bool)>> {
    let base = NormalizedPath::new(root);
    Ok(scan(root)?
        .into_iter()
        .filter_map(|entry| {
            let relative = entry.path.relative_to(&base)?.to_string();
            Some((relative, (entry.path, entry.is_dir)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum(b"hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        let file_cs = compute_file_checksum(&path).unwrap();
        assert_eq!(file_cs, compute_content_checksum(b"hello world"));
    }

    #[test]
    fn verify_reports_every_kind_of_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("same.txt"), "x").unwrap();
        std::fs::write(dst.join("same.txt"), "x").unwrap();
        std::fs::write(src.join("changed.txt"), "new").unwrap();
        std::fs::write(dst.join("changed.txt"), "old").unwrap();
        std::fs::write(src.join("missing.txt"), "m").unwrap();
        std::fs::write(dst.join("extra.txt"), "e").unwrap();
        std::fs::write(dst.join("sub"), "not a dir").unwrap();

        let mismatches = verify_mirror(&src, &dst).unwrap();

        assert_eq!(
            mismatches,
            vec![
                MirrorMismatch::ContentDiffers("changed.txt".into()),
                MirrorMismatch::Missing("missing.txt".into()),
                MirrorMismatch::KindDiffers("sub".into()),
                MirrorMismatch::Extra("extra.txt".into()),
            ]
        );
    }
}
