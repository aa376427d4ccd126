//! Watch configuration
//!
//! The configuration document lists watch entries; only the first one is
//! used. YAML and JSON documents are a top-level list, TOML documents use
//! `[[watch]]` tables:
//!
//! ```yaml
//! - path: ./notes
//!   commands:
//!     - git -C ./notes status --short
//! ```

use std::path::{Path, PathBuf};

use mirror_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Default backup directory, relative to the working directory
pub const DEFAULT_BACKUP_DIR: &str = "_backup";

/// What to record when a path is renamed away from its location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenamePolicy {
    /// Mirror the removal, write nothing to the change log
    #[default]
    Silent,
    /// Mirror the removal and record it as a `remove` entry
    LogAsRemove,
}

/// A single watched tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSetting {
    /// Root of the source tree
    pub path: PathBuf,
    /// Command lines to run after every accepted change, in order
    #[serde(default)]
    pub commands: Vec<String>,
    /// Root of the backup mirror
    #[serde(default = "default_backup")]
    pub backup: PathBuf,
    /// Trailing file-name characters editors use for temporary copies
    #[serde(default = "default_markers")]
    pub temp_markers: Vec<char>,
    #[serde(default)]
    pub rename_policy: RenamePolicy,
}

fn default_backup() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_DIR)
}

fn default_markers() -> Vec<char> {
    vec!['~']
}

impl WatchSetting {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commands: Vec::new(),
            backup: default_backup(),
            temp_markers: default_markers(),
            rename_policy: RenamePolicy::default(),
        }
    }

    pub fn with_backup(mut self, backup: impl Into<PathBuf>) -> Self {
        self.backup = backup.into();
        self
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_rename_policy(mut self, policy: RenamePolicy) -> Self {
        self.rename_policy = policy;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    List(Vec<WatchSetting>),
    Table { watch: Vec<WatchSetting> },
}

/// The parsed configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub settings: Vec<WatchSetting>,
}

impl<'de> Deserialize<'de> for WatchConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let settings = match ConfigDocument::deserialize(deserializer)? {
            ConfigDocument::List(settings) | ConfigDocument::Table { watch: settings } => settings,
        };
        Ok(Self { settings })
    }
}

impl WatchConfig {
    /// Load the document, format chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = ConfigStore::new().load(&NormalizedPath::new(path.as_ref()))?;
        if config.settings.is_empty() {
            return Err(Error::EmptyConfig {
                path: path.as_ref().to_path_buf(),
            });
        }
        Ok(config)
    }

    /// The entry that is actually watched.
    pub fn first(&self) -> Option<&WatchSetting> {
        self.settings.first()
    }

    pub fn into_first(self) -> Option<WatchSetting> {
        self.settings.into_iter().next()
    }
}
