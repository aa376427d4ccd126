//! [`TestTree`] builder for mirror test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Name of the source root inside the temporary directory.
pub const SOURCE_DIR: &str = "src";

/// Name of the backup root inside the temporary directory.
pub const BACKUP_DIR: &str = "_backup";

/// A temporary directory holding a source root and a (not yet created)
/// backup root next to it.
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::tree::TestTree;
///
/// let tree = TestTree::new().with_file("a.txt", "hello");
/// tree.assert_source_contains("a.txt", "hello");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create a temporary directory with an empty source root.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(SOURCE_DIR)).unwrap();
        Self { temp_dir }
    }

    /// Return the temporary directory holding both roots.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root().join(SOURCE_DIR)
    }

    pub fn backup(&self) -> PathBuf {
        self.root().join(BACKUP_DIR)
    }

    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.source().join(relative)
    }

    pub fn backup_path(&self, relative: &str) -> PathBuf {
        self.backup().join(relative)
    }

    /// Builder form of [`TestTree::write`].
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    /// Builder form of [`TestTree::mkdir`].
    pub fn with_dir(self, relative: &str) -> Self {
        self.mkdir(relative);
        self
    }

    /// Write a source file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.source_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    /// Create a source directory and its parents.
    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.source_path(relative)).unwrap();
    }

    /// Remove a source file or directory tree.
    pub fn remove(&self, relative: &str) {
        let path = self.source_path(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).unwrap();
        } else {
            fs::remove_file(&path).unwrap();
        }
    }

    /// Content of a mirrored file, `None` if it does not exist.
    pub fn read_backup(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.backup_path(relative)).ok()
    }

    /// Assert that the source file at `relative` has exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_source_contains(&self, relative: &str, content: &str) {
        let path = self.source_path(relative);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        assert_eq!(actual, content, "Unexpected content in {}", path.display());
    }

    /// Assert that the mirrored file at `relative` has exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_backup_contains(&self, relative: &str, content: &str) {
        let path = self.backup_path(relative);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read mirrored file: {}", path.display()));
        assert_eq!(actual, content, "Unexpected content in {}", path.display());
    }

    /// Assert that `relative` exists in the mirror.
    pub fn assert_backup_exists(&self, relative: &str) {
        let path = self.backup_path(relative);
        assert!(path.exists(), "Expected mirrored path to exist: {}", path.display());
    }

    /// Assert that `relative` does **not** exist in the mirror.
    pub fn assert_backup_missing(&self, relative: &str) {
        let path = self.backup_path(relative);
        assert!(!path.exists(), "Expected mirrored path NOT to exist: {}", path.display());
    }
}
