//! Command implementations

mod init;
mod log;
mod watch;

pub use init::run_init_only;
pub use log::run_log;
pub use watch::run_watch;

use std::path::Path;

use mirror_core::{WatchConfig, WatchSetting};

use crate::error::{CliError, Result};

/// The watched entry of the configuration, with the backup override applied.
pub(crate) fn load_setting(config: &Path, backup: Option<&Path>) -> Result<WatchSetting> {
    let mut setting = WatchConfig::load(config)?
        .into_first()
        .ok_or_else(|| CliError::user(format!("{} lists no watched path", config.display())))?;
    if let Some(backup) = backup {
        setting.backup = backup.to_path_buf();
    }
    Ok(setting)
}
